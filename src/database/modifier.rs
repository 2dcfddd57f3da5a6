//! Decoder for the compact string-encoded query-modifier language.
//!
//! Each instruction is `op[:arg1[:arg2]]`. The zero-argument ordering ops
//! are matched by case-insensitive equality; parameterized ops by
//! case-insensitive substring containment, in the same precedence order the
//! wire format has always used. Parsing happens exactly once at the host
//! boundary; everything downstream works with the [`Modifier`] sum type.

use crate::database::error::{invalid_modifier, unknown_modifier, DatabaseResult};

/// A single query-shaping instruction: ordering, range bound, or limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modifier {
    OrderByKey,
    OrderByValue,
    OrderByPriority,
    OrderByChild(String),
    LimitToFirst(u32),
    LimitToLast(u32),
    EqualTo { value: String, key: Option<String> },
    StartAt { value: String, key: Option<String> },
    EndAt { value: String, key: Option<String> },
}

/// What to do with an instruction whose op is not part of the grammar.
///
/// The wire format historically dropped unknown ops on the floor, which can
/// mask caller bugs; `Reject` turns them into a call-level error instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownModifierPolicy {
    #[default]
    Ignore,
    Reject,
}

/// Parses an ordered instruction sequence into modifiers.
///
/// The parser is total: every instruction either yields a [`Modifier`],
/// fails with an invalid-modifier error (malformed argument), or falls to
/// the unknown-op policy.
pub fn parse_modifiers(
    instructions: &[String],
    policy: UnknownModifierPolicy,
) -> DatabaseResult<Vec<Modifier>> {
    let mut parsed = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        match parse_instruction(instruction)? {
            Some(modifier) => parsed.push(modifier),
            None => match policy {
                UnknownModifierPolicy::Ignore => {
                    log::warn!("ignoring unrecognized query modifier: {instruction}");
                }
                UnknownModifierPolicy::Reject => {
                    return Err(unknown_modifier(instruction));
                }
            },
        }
    }
    Ok(parsed)
}

fn parse_instruction(instruction: &str) -> DatabaseResult<Option<Modifier>> {
    let mut parts = instruction.split(':');
    let op = parts.next().unwrap_or("").to_ascii_lowercase();
    let arg1 = parts.next();
    let arg2 = parts.next();

    if op == "orderbykey" {
        return Ok(Some(Modifier::OrderByKey));
    }
    if op == "orderbyvalue" {
        return Ok(Some(Modifier::OrderByValue));
    }
    if op == "orderbypriority" {
        return Ok(Some(Modifier::OrderByPriority));
    }
    if op.contains("orderbychild") {
        let field = required_arg(instruction, arg1)?;
        log::debug!("orderByChild: {field}");
        return Ok(Some(Modifier::OrderByChild(field.to_string())));
    }
    if op.contains("limittolast") {
        return Ok(Some(Modifier::LimitToLast(parse_limit(instruction, arg1)?)));
    }
    if op.contains("limittofirst") {
        return Ok(Some(Modifier::LimitToFirst(parse_limit(
            instruction,
            arg1,
        )?)));
    }
    if op.contains("equalto") {
        let value = required_arg(instruction, arg1)?.to_string();
        return Ok(Some(Modifier::EqualTo {
            value,
            key: arg2.map(str::to_string),
        }));
    }
    if op.contains("endat") {
        let value = required_arg(instruction, arg1)?.to_string();
        return Ok(Some(Modifier::EndAt {
            value,
            key: arg2.map(str::to_string),
        }));
    }
    if op.contains("startat") {
        let value = required_arg(instruction, arg1)?.to_string();
        return Ok(Some(Modifier::StartAt {
            value,
            key: arg2.map(str::to_string),
        }));
    }

    Ok(None)
}

fn required_arg<'a>(
    instruction: &str,
    arg: Option<&'a str>,
) -> DatabaseResult<&'a str> {
    arg.ok_or_else(|| {
        invalid_modifier(format!("Query modifier is missing its argument: {instruction}"))
    })
}

fn parse_limit(instruction: &str, arg: Option<&str>) -> DatabaseResult<u32> {
    let raw = required_arg(instruction, arg)?;
    raw.parse::<u32>().map_err(|_| {
        invalid_modifier(format!(
            "Query modifier limit is not a valid integer: {instruction}"
        ))
    })
}
