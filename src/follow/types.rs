use serde::Serialize;

use crate::store::{Feed, Post};

#[derive(Serialize)]
pub struct FollowResult<'a> {
    pub user: &'a str,
    pub feed_name: &'a str,
    pub feed_url: &'a str,
}

#[derive(Serialize)]
pub struct FollowingList<'a> {
    pub user: &'a str,
    pub feeds: &'a [Feed],
}

#[derive(Serialize)]
pub struct Timeline<'a> {
    pub user: &'a str,
    pub limit: i64,
    pub posts: &'a [Post],
}
