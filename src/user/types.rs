use serde::Serialize;

use crate::store::User;

#[derive(Serialize)]
pub struct CurrentUser<'a> {
    pub user: &'a User,
    pub config: String,
}

#[derive(Serialize)]
pub struct UserRow<'a> {
    pub name: &'a str,
    pub current: bool,
}

#[derive(Serialize)]
pub struct UserList<'a> {
    pub users: Vec<UserRow<'a>>,
}

#[derive(Serialize)]
pub struct ResetPlan {
    pub action: &'static str,
    pub users: usize,
}

#[derive(Serialize)]
pub struct ResetResult {
    pub deleted_users: u64,
}
