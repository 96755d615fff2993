//! Oracle-anchored AMM replay driver
//!
//! Reads one JSON request per line from stdin, runs it against an engine
//! seeded from the `[pool]` config section and writes one JSON result per
//! line to stdout. Logs go to stderr and the configured log directory.
//!
//! # Architecture
//! - **core**: Price, checked math, oracle reads, pool state
//! - **hot_path**: Oracle reconciliation, fee curve, inventory, recenter, preview
//! - **feeds**: Oracle feed traits and the secondary leg combiner
//! - **engine**: Swap pipeline and the shared engine handle
//! - **infrastructure**: Config, logging, metrics

use std::io::{self, BufRead, Write};

use anyhow::Context;
use oracle_amm::core::{Clock, OracleMode, OracleSnapshot, PoolState, SwapDirection};
use oracle_amm::engine::ConfigUpdate;
use oracle_amm::infrastructure::logging::init_logging;
use oracle_amm::{AmmEngine, Config, Settlement, SwapRequest, TokenCustody};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One replay line
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Swap {
        direction: SwapDirection,
        amount_in: u64,
        #[serde(default)]
        mode: OracleMode,
        #[serde(default)]
        min_amount_out: u64,
        snapshot: OracleSnapshot,
        #[serde(default)]
        clock: Clock,
    },
    Quote {
        direction: SwapDirection,
        amount_in: u64,
        #[serde(default)]
        mode: OracleMode,
        snapshot: OracleSnapshot,
        #[serde(default)]
        clock: Clock,
    },
    QuoteExactOutput {
        direction: SwapDirection,
        amount_out: u64,
        #[serde(default)]
        mode: OracleMode,
        snapshot: OracleSnapshot,
        #[serde(default)]
        clock: Clock,
    },
    RefreshPreview {
        #[serde(default)]
        mode: OracleMode,
        snapshot: OracleSnapshot,
        #[serde(default)]
        clock: Clock,
    },
    Preview {
        now_sec: u64,
    },
    Pool,
    Pause {
        caller: String,
        paused: bool,
    },
    UpdateConfig {
        caller: String,
        update: ConfigUpdate,
    },
    Recenter {
        caller: String,
        #[serde(default)]
        mode: OracleMode,
        snapshot: OracleSnapshot,
        #[serde(default)]
        clock: Clock,
    },
}

/// Custody stand-in: every transfer succeeds
#[derive(Default)]
struct ReplayCustody {
    settlements: u64,
}

impl TokenCustody for ReplayCustody {
    fn settle(&mut self, _pool: &mut PoolState, settlement: &Settlement) -> oracle_amm::Result<()> {
        self.settlements += 1;
        tracing::debug!(
            direction = ?settlement.direction,
            amount_in = settlement.amount_in,
            amount_out = settlement.amount_out,
            refund = settlement.leftover_amount_in,
            "settled"
        );
        Ok(())
    }
}

fn handle(engine: &AmmEngine, custody: &mut ReplayCustody, request: Request) -> Value {
    match request {
        Request::Swap {
            direction,
            amount_in,
            mode,
            min_amount_out,
            snapshot,
            clock,
        } => {
            let request = SwapRequest {
                direction,
                amount_in,
                mode,
                min_amount_out,
            };
            respond(engine.swap(&request, &snapshot, clock, custody))
        }
        Request::Quote {
            direction,
            amount_in,
            mode,
            snapshot,
            clock,
        } => respond(engine.quote(direction, amount_in, mode, &snapshot, clock)),
        Request::QuoteExactOutput {
            direction,
            amount_out,
            mode,
            snapshot,
            clock,
        } => respond(engine.quote_exact_output(direction, amount_out, mode, &snapshot, clock)),
        Request::RefreshPreview {
            mode,
            snapshot,
            clock,
        } => respond(
            engine
                .refresh_preview(mode, &snapshot, clock)
                .map(|refreshed| json!({ "refreshed": refreshed })),
        ),
        Request::Preview { now_sec } => respond(engine.get_ladder(now_sec)),
        Request::Pool => respond(Ok(engine.pool_snapshot())),
        Request::Pause { caller, paused } => respond(
            engine
                .set_paused(&caller, paused)
                .map(|()| json!({ "paused": paused })),
        ),
        Request::UpdateConfig { caller, update } => respond(
            engine
                .update_config(&caller, update)
                .map(|()| json!({ "updated": true })),
        ),
        Request::Recenter {
            caller,
            mode,
            snapshot,
            clock,
        } => respond(engine.manual_recenter(&caller, mode, &snapshot, clock)),
    }
}

fn respond<T: Serialize>(result: oracle_amm::Result<T>) -> Value {
    match result {
        Ok(value) => serde_json::to_value(value)
            .unwrap_or_else(|e| json!({ "error": "SERIALIZE", "message": e.to_string() })),
        Err(e) => json!({ "error": e.code(), "message": e.to_string() }),
    }
}

fn main() -> anyhow::Result<()> {
    // Load config or use defaults
    let config = Config::load().context("failed to load config")?;
    let _guards = init_logging(&config.logging).context("failed to initialize logging")?;

    tracing::info!(
        reserve_base = config.pool.reserve_base,
        reserve_quote = config.pool.reserve_quote,
        "Starting replay"
    );
    let engine = AmmEngine::from_config(config).context("failed to build engine")?;
    let mut custody = ReplayCustody::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle(&engine, &mut custody, request),
            Err(e) => json!({ "error": "BAD_REQUEST", "message": e.to_string(), "line": index + 1 }),
        };
        writeln!(stdout, "{response}").context("failed to write result")?;
    }

    let metrics = engine.metrics().snapshot();
    tracing::info!(
        quotes = metrics.quotes,
        swaps = metrics.swaps,
        partial_fills = metrics.partial_fills,
        settlements = custody.settlements,
        reject_rate = metrics.reject_rate,
        "Replay finished"
    );
    Ok(())
}
