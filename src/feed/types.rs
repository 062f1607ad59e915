use serde::Serialize;

use crate::store::{Feed, FeedListing};

#[derive(Serialize)]
pub struct FeedAddResult<'a> {
    pub feed: &'a Feed,
    pub followed_by: &'a str,
}

#[derive(Serialize)]
pub struct FeedList<'a> {
    pub feeds: &'a [FeedListing],
}
