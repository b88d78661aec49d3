// SPDX-License-Identifier: MIT

pub mod confluence;

pub use confluence::{
    ConfluenceClient, DocumentRepository, GetPageTool, PageDetails, PageFetch, PageSummary,
    SearchPagesTool, SearchResults,
};
