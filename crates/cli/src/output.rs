//! Rendering of query results and the usage text.

use std::io::{self, Write};

use agent_activity::{ActivityRecord, KNOWN_ACTIONS};

/// One JSON object per line, or aligned columns with `pretty`.
pub fn write_records<W: Write>(
    out: &mut W,
    records: &[ActivityRecord],
    pretty: bool,
) -> io::Result<()> {
    for record in records {
        if pretty {
            writeln!(
                out,
                "{}  #{:<6} {:<16} {:<14} {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.issue_number,
                record.agent_id,
                record.action,
                record.details
            )?;
        } else {
            let line = serde_json::to_string(record).map_err(io::Error::from)?;
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Usage: log_agent_activity <action> <issue_number> [agent_id] [details]"
    )?;
    writeln!(out, "\nActions:")?;
    for (name, description) in KNOWN_ACTIONS {
        writeln!(out, "  {:<15} - {}", name, description)?;
    }
    Ok(())
}
