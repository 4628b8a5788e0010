use tracing::{info, warn};

use crate::control::{StatisticsReport, TestParameters};

use super::ids::SessionId;

/// Wire statistics are in microseconds, local timestamps in milliseconds.
const MICROS_PER_MILLI: i64 = 1_000;
const MILLIS_PER_SECOND: u128 = 1_000;
const BYTES_PER_KILOBYTE: u64 = 1_024;
const BITS_PER_BYTE: u64 = 8;
const BITS_PER_MEGABIT: u64 = 1_024 * 1_024;

/// Server-side epoch times (ms) collected by the completion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalTimestamps {
    pub first_received_ms: Option<i64>,
    pub last_received_ms: Option<i64>,
    pub first_sent_ms: Option<i64>,
    pub last_sent_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionRates {
    pub units_per_sec: u64,
    pub bytes_per_sec: u64,
    pub kilobytes_per_sec: u64,
    pub bits_per_sec: u64,
    pub megabits_per_sec: u64,
}

/// Aggregate results of one test. Directions that carried no data, or whose
/// timestamps do not span a positive interval, are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThroughputReport {
    pub received: Option<DirectionRates>,
    pub sent: Option<DirectionRates>,
    pub client_to_server_delay_ms: Option<i64>,
    pub server_to_client_delay_ms: Option<i64>,
    pub rtt_ms: Option<i64>,
}

/// Writes the server's timestamps into the client's partial report, for the
/// directions the server took part in.
pub fn merge_local_timestamps(
    stats: &mut StatisticsReport,
    params: &TestParameters,
    local: &LocalTimestamps,
) {
    if params.client_sends {
        stats.server_first_received_us = millis_to_micros(local.first_received_ms);
        stats.server_last_received_us = millis_to_micros(local.last_received_ms);
    }
    if params.server_sends {
        stats.server_first_sent_us = millis_to_micros(local.first_sent_ms);
        stats.server_last_sent_us = millis_to_micros(local.last_sent_ms);
    }
}

/// Computes rates and delays from a merged report. Every timestamp is
/// normalized to milliseconds before any arithmetic.
#[must_use]
pub fn compute_throughput(params: &TestParameters, stats: &StatisticsReport) -> ThroughputReport {
    let total_units = u64::from(params.flow_count).saturating_mul(u64::from(params.sdus_per_flow));
    let mut report = ThroughputReport::default();

    if params.client_sends {
        let first_received = micros_to_millis(stats.server_first_received_us);
        let last_received = micros_to_millis(stats.server_last_received_us);
        report.received =
            direction_rates(total_units, params.sdu_size, first_received, last_received);
        report.client_to_server_delay_ms = Some(average_delay(
            first_received.saturating_sub(micros_to_millis(stats.client_first_sent_us)),
            last_received.saturating_sub(micros_to_millis(stats.client_last_sent_us)),
        ));
    }

    if params.server_sends {
        let first_received = micros_to_millis(stats.client_first_received_us);
        let last_received = micros_to_millis(stats.client_last_received_us);
        report.sent = direction_rates(total_units, params.sdu_size, first_received, last_received);
        report.server_to_client_delay_ms = Some(average_delay(
            first_received.saturating_sub(micros_to_millis(stats.server_first_sent_us)),
            last_received.saturating_sub(micros_to_millis(stats.server_last_sent_us)),
        ));
    }

    report.rtt_ms = match (
        report.client_to_server_delay_ms,
        report.server_to_client_delay_ms,
    ) {
        (Some(upstream), Some(downstream)) => Some(upstream.saturating_add(downstream)),
        (Some(one_way), None) | (None, Some(one_way)) => Some(one_way.saturating_mul(2)),
        (None, None) => None,
    };
    report
}

pub(super) fn log_throughput(session_id: SessionId, report: &ThroughputReport) {
    info!("Session {}: aggregate bandwidth", session_id);
    if let Some(rates) = report.received.as_ref() {
        log_direction(session_id, "received", rates);
    }
    if let Some(rates) = report.sent.as_ref() {
        log_direction(session_id, "sent", rates);
    }
    match report.rtt_ms {
        Some(rtt_ms) => info!(
            "Session {}: estimated round-trip time (RTT) in ms: {}",
            session_id, rtt_ms
        ),
        None => warn!(
            "Session {}: no direction carried data, RTT not estimated",
            session_id
        ),
    }
}

fn log_direction(session_id: SessionId, direction: &str, rates: &DirectionRates) {
    info!(
        "Session {}: aggregate {} SDUs per second: {}",
        session_id, direction, rates.units_per_sec
    );
    info!(
        "Session {}: aggregate {} KiloBytes per second (KBps): {}",
        session_id, direction, rates.kilobytes_per_sec
    );
    info!(
        "Session {}: aggregate {} Megabits per second (Mbps): {}",
        session_id, direction, rates.megabits_per_sec
    );
}

fn direction_rates(
    total_units: u64,
    sdu_size: u32,
    first_ms: i64,
    last_ms: i64,
) -> Option<DirectionRates> {
    let elapsed_ms = last_ms.checked_sub(first_ms)?;
    let Ok(elapsed_ms) = u128::try_from(elapsed_ms) else {
        warn!(
            "Last SDU timestamp {} precedes first SDU timestamp {}",
            last_ms, first_ms
        );
        return None;
    };
    if elapsed_ms == 0 {
        warn!("First and last SDU share timestamp {}, rate undefined", first_ms);
        return None;
    }
    let units_per_sec = u128::from(total_units)
        .saturating_mul(MILLIS_PER_SECOND)
        .checked_div(elapsed_ms)
        .unwrap_or(0);
    let units_per_sec = u64::try_from(units_per_sec).unwrap_or(u64::MAX);
    let bytes_per_sec = units_per_sec.saturating_mul(u64::from(sdu_size));
    let bits_per_sec = bytes_per_sec.saturating_mul(BITS_PER_BYTE);
    Some(DirectionRates {
        units_per_sec,
        bytes_per_sec,
        kilobytes_per_sec: bytes_per_sec / BYTES_PER_KILOBYTE,
        bits_per_sec,
        megabits_per_sec: bits_per_sec / BITS_PER_MEGABIT,
    })
}

const fn average_delay(first_delay_ms: i64, last_delay_ms: i64) -> i64 {
    first_delay_ms.saturating_add(last_delay_ms) / 2
}

fn millis_to_micros(value: Option<i64>) -> i64 {
    value.map_or(0, |ms| ms.saturating_mul(MICROS_PER_MILLI))
}

const fn micros_to_millis(value: i64) -> i64 {
    value / MICROS_PER_MILLI
}
