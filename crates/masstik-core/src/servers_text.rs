// ── Servers text parsing ──
//
// The servers list is edited as free text, one device per line. Parsing
// never fails: anything that does not look like an address is dropped.
// Ids are carried over from the previous list by URL so the displayed
// list can keep its items across edits.

use crate::model::{Server, ServerId};

/// Extract device addresses from a newline-delimited text block.
///
/// Blank lines and `#` comments are skipped; anything after the first
/// whitespace on a line is ignored.
pub fn parse_entries(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .collect()
}

/// Build a new server list from `text`, reusing ids of `previous`.
///
/// Each entry takes the first previous server with the same URL that has
/// not been claimed yet, keeping its id and status. Entries without a
/// match receive fresh ids starting at `next_id`. Returns the list and
/// the next unallocated id. `u32::MAX` is never allocated; lines that
/// would need an id past it are left out.
pub fn merge_servers(text: &str, previous: &[Server], next_id: u32) -> (Vec<Server>, u32) {
    let mut claimed = vec![false; previous.len()];
    let mut next_id = next_id;

    let servers = parse_entries(text)
        .into_iter()
        .filter_map(|url| {
            let reused = previous
                .iter()
                .enumerate()
                .find(|(idx, server)| !claimed[*idx] && server.url == url);

            if let Some((idx, server)) = reused {
                claimed[idx] = true;
                return Some(server.clone());
            }

            // Id space exhausted: the line is dropped.
            let id = next_id;
            next_id = next_id.checked_add(1)?;
            Some(Server::new(ServerId(id), url))
        })
        .collect();

    (servers, next_id)
}

/// Render a server list back to its editable text form.
pub fn servers_text(servers: &[Server]) -> String {
    servers
        .iter()
        .map(|s| s.url.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
