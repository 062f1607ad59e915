use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Agg;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Worker, Tick, Claim, Fetch, Normalize, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Worker => "worker",
        Phase::Tick => "tick",
        Phase::Claim => "claim",
        Phase::Fetch => "fetch",
        Phase::Normalize => "normalize",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Worker => info_span!("worker"),
        Phase::Tick => info_span!("tick"),
        Phase::Claim => info_span!("claim"),
        Phase::Fetch => info_span!("fetch"),
        Phase::Normalize => info_span!("normalize"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Agg {
    const NAME: &'static str = "agg";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("agg") }
}
