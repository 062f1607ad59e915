pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one typed context per command family
pub fn agg() -> LogCtx<ops::agg::Agg> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn feed() -> LogCtx<ops::feed::Feed> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn follow() -> LogCtx<ops::follow::Follow> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn init() -> LogCtx<ops::init::Init> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn user() -> LogCtx<ops::user::User> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
