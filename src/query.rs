use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::common::*;
use crate::errors::*;
use crate::parser::*;
use crate::transport::*;
use crate::util::Opcode;

/// Servers with more players than this don't get their player list fetched.
pub const MAX_PLAYERS_LISTED: u16 = 100;
/// Worker threads [query_all] uses at most.
pub const MAX_IN_FLIGHT: usize = 32;

/// Queries a server for its info, rules and players.
///
/// Either everything succeeds or the first error is returned.
pub fn query(options: &QueryOptions) -> Result<QueryResult> {
    query_with(&UdpTransport, options)
}

/// Same as [query] but over the given transport.
pub fn query_with<T: Transport + ?Sized>(
    transport: &T,
    options: &QueryOptions,
) -> Result<QueryResult> {
    let target = options.validate()?;

    let info = parse_info(&transport.exchange(&target, Opcode::Info)?)?;
    log::debug!(
        "{}:{} info: '{}' {}/{}",
        target.host,
        target.port,
        info.hostname,
        info.players,
        info.max_players
    );

    let rules = parse_rules(&transport.exchange(&target, Opcode::Rules)?)?;
    log::debug!("{}:{} sent {} rules", target.host, target.port, rules.len());

    let players = if info.players > MAX_PLAYERS_LISTED {
        log::debug!(
            "{}:{} has {} players online, skipping player list",
            target.host,
            target.port,
            info.players
        );
        Vec::new()
    } else {
        parse_players(&transport.exchange(&target, Opcode::Players)?)?
    };

    Ok(QueryResult {
        address: target.host,
        hostname: info.hostname,
        gamemode: info.gamemode,
        mapname: info.mapname,
        passworded: info.passworded,
        maxplayers: info.max_players,
        online: info.players,
        rules,
        players,
    })
}

/// Queries every server concurrently on up to [MAX_IN_FLIGHT] threads.
///
/// Results are in the same order as `servers`.
pub fn query_all(servers: &[QueryOptions]) -> Vec<Result<QueryResult>> {
    query_all_with(&UdpTransport, servers, MAX_IN_FLIGHT)
}

/// Same as [query_all] over the given transport, with at most
/// `max_in_flight` queries running at once.
///
/// Workers pull the next server from a shared cursor. If no worker thread
/// can be started the queries run on the calling thread.
pub fn query_all_with<T: Transport + Sync + ?Sized>(
    transport: &T,
    servers: &[QueryOptions],
    max_in_flight: usize,
) -> Vec<Result<QueryResult>> {
    let workers = max_in_flight.max(1).min(servers.len());
    let next = AtomicUsize::new(0);
    let worker = || {
        let mut done = Vec::new();
        loop {
            let i = next.fetch_add(1, Ordering::Relaxed);
            match servers.get(i) {
                Some(options) => done.push((i, query_with(transport, options))),
                None => break done,
            }
        }
    };

    let mut slots: Vec<Option<Result<QueryResult>>> = servers.iter().map(|_| None).collect();
    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .filter_map(|n| {
                thread::Builder::new()
                    .name(format!("samp-query-{}", n))
                    .spawn_scoped(s, &worker)
                    .map_err(|e| log::warn!("can't start query worker {}: {}", n, e))
                    .ok()
            })
            .collect();
        log::debug!("querying {} servers on {} threads", servers.len(), handles.len());

        let mut done = if handles.is_empty() {
            worker()
        } else {
            Vec::new()
        };
        for h in handles {
            match h.join() {
                Ok(res) => done.extend(res),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        for (i, res) in done {
            slots[i] = Some(res);
        }
    });

    // Every index is handed out exactly once, so no slot is left empty.
    slots.into_iter().flatten().collect()
}

/// Measures the round trip time to a server.
pub fn ping(options: &QueryOptions) -> Result<Duration> {
    let target = options.validate()?;
    Session::open(&target)?.ping()
}
