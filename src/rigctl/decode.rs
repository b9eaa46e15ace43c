//! Pure decoding: reply text + command context → RigctlReply.
//!
//! No I/O, no side effects. The `cmd` parameter tells us which fields
//! to expect; rigctld replies carry no prefix identifying the query.

use crate::domain::{AzEl, LinkError, LinkResult};

use super::{RigctlCommand, RigctlReply};

/// Decode a raw reply from the daemon into a typed RigctlReply.
///
/// Returns `Err(LinkError::Protocol)` for an empty reply, an `RPRT` error
/// report to a query, or a malformed numeric token.
pub fn decode(response: &str, cmd: &RigctlCommand) -> LinkResult<RigctlReply> {
    use RigctlCommand::*;

    match cmd {
        SetPtt(_) | SetFreq(_) | SetSplitFreq(_) | Aos | Los => Ok(RigctlReply::Sent),
        SetPos(_) => parse_report(response, cmd),
        GetPtt | GetDcd => parse_flag(first_line(response, cmd)?),
        GetFreq | GetSplitFreq => parse_frequency(first_line(response, cmd)?),
        GetPos => parse_position(response, cmd),
    }
}

/// First line of a query reply, rejecting empty replies and error reports.
fn first_line<'a>(response: &'a str, cmd: &RigctlCommand) -> LinkResult<&'a str> {
    let line = response.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Err(LinkError::Protocol(format!("Empty reply to {cmd:?}")));
    }
    if line.starts_with("RPRT") {
        return Err(LinkError::Protocol(format!(
            "Daemon returned error for {cmd:?}: '{line}'"
        )));
    }
    Ok(line)
}

/// Parse `"1\n"` → `Ptt(true)`. Anything other than 1 is "off".
fn parse_flag(line: &str) -> LinkResult<RigctlReply> {
    let token = line.split_whitespace().next().unwrap_or(line);
    let value = token
        .parse::<u64>()
        .map_err(|e| LinkError::Protocol(format!("Failed to parse PTT '{token}': {e}")))?;
    Ok(RigctlReply::Ptt(value == 1))
}

/// Parse `"145890000\n"` → `FrequencyHz(145_890_000.0)`
fn parse_frequency(line: &str) -> LinkResult<RigctlReply> {
    let token = line.split_whitespace().next().unwrap_or(line);
    let hz = token
        .parse::<f64>()
        .map_err(|e| LinkError::Protocol(format!("Failed to parse frequency '{token}': {e}")))?;
    if !hz.is_finite() || hz < 0.0 {
        return Err(LinkError::Protocol(format!("Invalid frequency '{token}'")));
    }
    Ok(RigctlReply::FrequencyHz(hz))
}

/// Parse `"180.00\n45.00\n"` → `Position(AzEl { az: 180, el: 45 })`
fn parse_position(response: &str, cmd: &RigctlCommand) -> LinkResult<RigctlReply> {
    let first = first_line(response, cmd)?;
    let second = response
        .lines()
        .nth(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            LinkError::Protocol(format!("Bad position reply: '{}'", response.trim()))
        })?;
    let az = parse_degrees(first)?;
    let el = parse_degrees(second)?;
    Ok(RigctlReply::Position(AzEl::new(az, el)))
}

fn parse_degrees(token: &str) -> LinkResult<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LinkError::Protocol(format!("Failed to parse angle '{token}'")))
}

/// Parse `"RPRT 0"` → `Report(0)`
fn parse_report(response: &str, cmd: &RigctlCommand) -> LinkResult<RigctlReply> {
    let trimmed = response.trim();
    let code = trimmed
        .strip_prefix("RPRT")
        .map(str::trim)
        .and_then(|c| c.split_whitespace().next())
        .and_then(|c| c.parse::<i32>().ok())
        .ok_or_else(|| {
            LinkError::Protocol(format!("Expected RPRT for {cmd:?}, got: '{trimmed}'"))
        })?;
    Ok(RigctlReply::Report(code))
}
