use nom::bytes::complete::take;
use nom::combinator::map;
use nom::multi::{length_count, length_data};
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::{pair, preceded, tuple};
use nom::IResult;

use crate::common::*;
use crate::errors::*;
use crate::util::HEADER_SIZE;

fn header(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take(HEADER_SIZE)(i)
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// String prefixed by a 2 byte length.
fn long_str(i: &[u8]) -> IResult<&[u8], String> {
    map(length_data(le_u16), lossy)(i)
}

/// String prefixed by a 1 byte length.
fn short_str(i: &[u8]) -> IResult<&[u8], String> {
    map(length_data(le_u8), lossy)(i)
}

fn server_info(i: &[u8]) -> IResult<&[u8], ServerInfo> {
    map(
        preceded(
            header,
            tuple((le_u8, le_u16, le_u16, long_str, long_str, long_str)),
        ),
        |(password, players, max_players, hostname, gamemode, mapname)| ServerInfo {
            passworded: password == 1,
            players,
            max_players,
            hostname,
            gamemode,
            mapname,
        },
    )(i)
}

fn raw_rules(i: &[u8]) -> IResult<&[u8], Vec<(String, String)>> {
    preceded(header, length_count(le_u16, pair(short_str, short_str)))(i)
}

fn player(i: &[u8]) -> IResult<&[u8], Player> {
    map(
        tuple((le_u8, short_str, le_u16, le_u16)),
        |(id, name, score, ping)| Player {
            id,
            name,
            score,
            ping,
        },
    )(i)
}

fn player_list(i: &[u8]) -> IResult<&[u8], Vec<Player>> {
    preceded(header, length_count(le_u16, player))(i)
}

fn describe(err: nom::Err<nom::error::Error<&[u8]>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "not enough data".to_owned(),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!(
            "ran out of data ({:?}) with {} bytes left",
            e.code,
            e.input.len()
        ),
    }
}

/// Decodes an info reply, header included. Trailing bytes are ignored.
pub fn parse_info(data: &[u8]) -> Result<ServerInfo> {
    let (_, info) =
        server_info(data).map_err(|e| RequestError::malformed(ResponseKind::Info, describe(e)))?;
    Ok(info)
}

/// Reads the integer at the start of `value`, skipping leading whitespace
/// and ignoring anything after the digits.
fn leading_int(value: &str) -> Option<i32> {
    let value = value.trim_start();
    let sign = value.starts_with(|c: char| c == '-' || c == '+') as usize;
    let digits = value[sign..].bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    value[..sign + digits].parse().ok()
}

/// Decodes a rules reply and coerces `lagcomp` to a bool and `weather` to an int.
pub fn parse_rules(data: &[u8]) -> Result<RuleSet> {
    let (_, raw) =
        raw_rules(data).map_err(|e| RequestError::malformed(ResponseKind::Rules, describe(e)))?;

    let mut rules = RuleSet::new();
    for (name, value) in raw {
        let value = match name.as_str() {
            "lagcomp" => RuleValue::Bool(value == "On"),
            "weather" => match leading_int(&value) {
                Some(w) => RuleValue::Int(w),
                None => {
                    log::warn!("weather rule '{}' is not a number", value);
                    return Err(RequestError::malformed(
                        ResponseKind::Rules,
                        format!("weather '{}' is not a number", value),
                    ));
                }
            },
            _ => RuleValue::Text(value),
        };
        rules.insert(name, value);
    }
    Ok(rules)
}

/// Decodes a players reply, keeping the order the server sent.
pub fn parse_players(data: &[u8]) -> Result<Vec<Player>> {
    let (_, players) = player_list(data)
        .map_err(|e| RequestError::malformed(ResponseKind::Players, describe(e)))?;
    Ok(players)
}

/// Checks that a ping reply echoes the challenge we sent.
pub fn check_ping(data: &[u8], challenge: &[u8; 4]) -> Result<()> {
    if data.len() < HEADER_SIZE + challenge.len() {
        return Err(RequestError::malformed(
            ResponseKind::Ping,
            format!("{} bytes is too short for a ping reply", data.len()),
        ));
    }
    if &data[data.len() - challenge.len()..] != challenge {
        return Err(RequestError::malformed(
            ResponseKind::Ping,
            "challenge was not echoed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use pretty_assertions::assert_eq;

    fn with_header() -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put(&b"SAMP\x7f\x00\x00\x01\x61\x1e"[..]);
        buf
    }

    fn put_long(buf: &mut BytesMut, s: &str) {
        buf.put_u16_le(s.len() as u16);
        buf.put(s.as_bytes());
    }

    fn put_short(buf: &mut BytesMut, s: &str) {
        buf.put_u8(s.len() as u8);
        buf.put(s.as_bytes());
    }

    fn rules_packet(rules: &[(&str, &str)]) -> BytesMut {
        let mut buf = with_header();
        buf.put_u16_le(rules.len() as u16);
        for (name, value) in rules {
            put_short(&mut buf, name);
            put_short(&mut buf, value);
        }
        buf
    }

    #[test]
    fn info_parses() {
        let mut buf = with_header();
        buf.put_u8(1);
        buf.put_u16_le(5);
        buf.put_u16_le(32);
        put_long(&mut buf, "Test Server");
        put_long(&mut buf, "DM");
        put_long(&mut buf, "desert");
        buf.put(&b"trailing"[..]);

        let info = parse_info(&buf).unwrap();
        assert_eq!(
            info,
            ServerInfo {
                passworded: true,
                players: 5,
                max_players: 32,
                hostname: "Test Server".into(),
                gamemode: "DM".into(),
                mapname: "desert".into(),
            }
        );
    }

    #[test]
    fn info_truncated() {
        let mut buf = with_header();
        buf.put_u8(0);
        buf.put_u16_le(5);
        buf.put_u16_le(32);
        buf.put_u16_le(11);
        buf.put(&b"Test"[..]);

        match parse_info(&buf) {
            Err(RequestError::MalformedResponse { kind, .. }) => {
                assert_eq!(kind, ResponseKind::Info)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn info_invalid_utf8_is_lossy() {
        let mut buf = with_header();
        buf.put_u8(0);
        buf.put_u16_le(0);
        buf.put_u16_le(50);
        buf.put_u16_le(3);
        buf.put(&b"a\xffb"[..]);
        put_long(&mut buf, "RP");
        put_long(&mut buf, "");

        let info = parse_info(&buf).unwrap();
        assert_eq!(info.hostname, "a\u{fffd}b");
        assert!(!info.passworded);
        assert_eq!(info.mapname, "");
    }

    #[test]
    fn rules_coerced() {
        let buf = rules_packet(&[
            ("lagcomp", "On"),
            ("mapname", "San Andreas"),
            ("weather", "3"),
        ]);
        let rules = parse_rules(&buf).unwrap();
        assert_eq!(rules.lagcomp(), Some(true));
        assert_eq!(rules.weather(), Some(3));
        assert_eq!(
            rules.get("mapname"),
            Some(&RuleValue::Text("San Andreas".into()))
        );
        assert_eq!(rules.len(), 3);

        let rules = parse_rules(&rules_packet(&[("lagcomp", "Off")])).unwrap();
        assert_eq!(rules.lagcomp(), Some(false));
        assert_eq!(rules.weather(), None);
    }

    #[test]
    fn rules_bad_weather_fails() {
        let buf = rules_packet(&[("lagcomp", "On"), ("weather", "sunny")]);
        match parse_rules(&buf) {
            Err(RequestError::MalformedResponse { kind, reason }) => {
                assert_eq!(kind, ResponseKind::Rules);
                assert!(reason.contains("sunny"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn weather_reads_leading_digits() {
        for (raw, expected) in [(" 3", 3), ("3a", 3), ("+12", 12), ("-2", -2), ("007", 7)].iter() {
            let rules = parse_rules(&rules_packet(&[("weather", *raw)])).unwrap();
            assert_eq!(rules.weather(), Some(*expected), "weather '{}'", raw);
        }
        for raw in ["", " ", "-", "x3", "99999999999"].iter() {
            assert!(
                parse_rules(&rules_packet(&[("weather", *raw)])).is_err(),
                "weather '{}'",
                raw
            );
        }
    }

    #[test]
    fn rules_truncated() {
        let mut buf = rules_packet(&[("version", "0.3.7")]);
        buf[HEADER_SIZE] = 2;
        assert!(matches!(
            parse_rules(&buf),
            Err(RequestError::MalformedResponse {
                kind: ResponseKind::Rules,
                ..
            })
        ));
    }

    #[test]
    fn players_parse_in_order() {
        let mut buf = with_header();
        buf.put_u16_le(2);
        for (id, name, score, ping) in [(0u8, "Carl", 120u16, 45u16), (7, "Sweet", 3, 210)].iter() {
            buf.put_u8(*id);
            put_short(&mut buf, name);
            buf.put_u16_le(*score);
            buf.put_u16_le(*ping);
        }

        let players = parse_players(&buf).unwrap();
        assert_eq!(
            players,
            vec![
                Player {
                    id: 0,
                    name: "Carl".into(),
                    score: 120,
                    ping: 45,
                },
                Player {
                    id: 7,
                    name: "Sweet".into(),
                    score: 3,
                    ping: 210,
                },
            ]
        );
    }

    #[test]
    fn players_truncated() {
        let mut buf = with_header();
        buf.put_u16_le(1);
        buf.put_u8(3);
        put_short(&mut buf, "Ryder");
        buf.put_u8(1);

        assert!(matches!(
            parse_players(&buf),
            Err(RequestError::MalformedResponse {
                kind: ResponseKind::Players,
                ..
            })
        ));
    }

    #[test]
    fn short_data_never_panics() {
        for len in 0..HEADER_SIZE + 2 {
            let data = vec![0xffu8; len];
            assert!(parse_info(&data).is_err());
            assert!(parse_rules(&data).is_err());
            assert!(parse_players(&data).is_err());
        }
    }

    #[test]
    fn ping_checks_challenge() {
        let mut buf = with_header();
        buf.put_u8(b'p');
        buf.put(&[1u8, 2, 3, 4][..]);
        assert!(check_ping(&buf, &[1, 2, 3, 4]).is_ok());
        assert!(check_ping(&buf, &[4, 3, 2, 1]).is_err());
        assert!(check_ping(&buf[..12], &[1, 2, 3, 4]).is_err());
    }
}
