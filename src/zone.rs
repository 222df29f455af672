//! Zone file rendering.
//!
//! Each record becomes one tab-separated line:
//!
//! ```text
//! www	3600	IN	A	203.0.113.5
//! @	3600	IN	MX	10 mail.example.com.
//! @	300	IN	TXT	"v=spf1 -all"
//! ```

use crate::error::{NfsnError, Result};
use crate::record::{RecordType, ResourceRecord};

/// Render records as zone file lines, sorted by name (apex as `@`) followed by
/// data. The last element is an empty string so that joining with `\n` ends
/// the file with a newline.
pub fn render(records: &[ResourceRecord]) -> Vec<String> {
    let mut sorted: Vec<&ResourceRecord> = records.iter().collect();
    sorted.sort_by_cached_key(|record| format!("{}{}", record.display_name(), record.data));

    let mut lines: Vec<String> = sorted.into_iter().map(render_record).collect();
    lines.push(String::new());
    lines
}

/// An MX record without a priority is written with priority 0, so it parses
/// back with `aux` set to `Some(0)`.
fn render_record(record: &ResourceRecord) -> String {
    let data = match record.record_type {
        RecordType::Txt => format!("\"{}\"", record.data),
        RecordType::Mx => format!("{} {}", record.aux.unwrap_or_default(), record.data),
        _ => record.data.clone(),
    };

    format!(
        "{}\t{}\tIN\t{}\t{}",
        record.display_name(),
        record.ttl,
        record.record_type,
        data
    )
}

/// Parse a line produced by [`render`] back into a record.
pub fn parse_line(line: &str) -> Result<ResourceRecord> {
    let fields: Vec<&str> = line.splitn(5, '\t').collect();
    let [name, ttl, class, record_type, data] = fields[..] else {
        return Err(NfsnError::Parse(format!("malformed zone line: {:?}", line)));
    };

    if class != "IN" {
        return Err(NfsnError::Parse(format!("unsupported class {:?}", class)));
    }
    let ttl = ttl
        .parse()
        .map_err(|_| NfsnError::Parse(format!("invalid TTL {:?}", ttl)))?;
    let record_type = RecordType::from(record_type);

    let mut aux = None;
    let data = match record_type {
        RecordType::Txt => data
            .strip_prefix('"')
            .and_then(|d| d.strip_suffix('"'))
            .ok_or_else(|| NfsnError::Parse(format!("unquoted TXT data {:?}", data)))?
            .to_string(),
        RecordType::Mx => {
            let (priority, host) = data
                .split_once(' ')
                .ok_or_else(|| NfsnError::Parse(format!("MX data without priority {:?}", data)))?;
            aux = Some(
                priority
                    .parse()
                    .map_err(|_| NfsnError::Parse(format!("invalid MX priority {:?}", priority)))?,
            );
            host.to_string()
        }
        _ => data.to_string(),
    };

    let mut record = ResourceRecord::new(
        if name == "@" { "" } else { name },
        record_type,
        data,
        ttl,
    );
    record.aux = aux;
    Ok(record)
}
