// SPDX-License-Identifier: MIT

pub mod pipeline;
pub mod server;
pub mod tools;
pub mod workflow;
