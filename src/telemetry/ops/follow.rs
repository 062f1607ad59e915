use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Follow;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Follow, Unfollow, List, Browse }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Follow => "follow",
        Phase::Unfollow => "unfollow",
        Phase::List => "list",
        Phase::Browse => "browse",
    }}
    fn span(&self) -> Span { match self {
        Phase::Follow => info_span!("follow"),
        Phase::Unfollow => info_span!("unfollow"),
        Phase::List => info_span!("list"),
        Phase::Browse => info_span!("browse"),
    }}
}

impl OpMarker for Follow {
    const NAME: &'static str = "follow";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("follow") }
}
