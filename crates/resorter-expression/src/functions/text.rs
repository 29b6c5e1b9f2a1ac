//! Text functions. Each reads slot 0 as text: the file path by default, or
//! the left side of a `.` chain.

use crate::error::EvalError;
use crate::types::{Arity, CallArgs, FunctionDefinition};
use crate::util;
use crate::value::Value;
use encoding_rs::Encoding;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper-cases the first letter of every run of letters, lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn cap_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    Ok(Value::Str(capitalize(&args.str(0)?)))
}

fn low_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    Ok(Value::Str(args.str(0)?.to_lowercase()))
}

fn up_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    Ok(Value::Str(args.str(0)?.to_uppercase()))
}

fn title_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    Ok(Value::Str(title_case(&args.str(0)?)))
}

fn replace_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let text = args.str(0)?;
    let from = args.str(1)?;
    let to = args.str(2)?;
    if from.is_empty() {
        return Ok(Value::Str(text));
    }
    Ok(Value::Str(text.replace(&from, &to)))
}

/// Applies the `[from, to]` slicing arguments in slots 1 and 2 to `text`.
pub fn slice_args(args: &mut CallArgs<'_>, text: &str) -> Result<String, EvalError> {
    let given = args.len().saturating_sub(1);
    let from = args.opt_int(1)?;
    let to = args.opt_int(2)?;
    let (from, to) = util::slice_range(from, to, given);
    Ok(util::slice_chars(text, from, to))
}

fn sub_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let text = args.str(0)?;
    slice_args(args, &text).map(Value::Str)
}

fn index_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let text = args.str(0)?;
    for needle in args.rest(1)? {
        if let Some(byte) = text.find(&needle.to_string()) {
            return Ok(Value::Int(text[..byte].chars().count() as i64));
        }
    }
    Ok(Value::Int(-1))
}

fn len_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    match args.value(0)? {
        Value::List(items) => Ok(Value::from(items.len())),
        other => Ok(Value::from(other.to_string().chars().count())),
    }
}

/// Reads each character of `text` as one byte and decodes the bytes with
/// the encoding named by `label`. This repairs names that were decoded with
/// the wrong code page.
pub fn decode(text: &str, label: &str) -> Result<String, EvalError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EvalError::function("decode", format!("unknown encoding \"{label}\"")))?;
    let bytes = text
        .chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                EvalError::function("decode", format!("'{c}' does not fit in one byte"))
            })
        })
        .collect::<Result<Vec<u8>, _>>()?;
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(|decoded| decoded.into_owned())
        .ok_or_else(|| {
            EvalError::function("decode", format!("\"{text}\" is not valid {}", encoding.name()))
        })
}

fn decode_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    let text = args.str(0)?;
    let label = args.str(1)?;
    decode(&text, &label).map(Value::Str)
}

fn str_eval(args: &mut CallArgs<'_>) -> Result<Value, EvalError> {
    args.str(0).map(Value::Str)
}

pub fn functions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition::new("cap", "capitalize the first letter, lower-case the rest", cap_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"hELLO world\".cap"),
        FunctionDefinition::new("low", "lower case", low_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"ABC\".low"),
        FunctionDefinition::new("up", "upper case", up_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"abc\".up"),
        FunctionDefinition::new("title", "capitalize every word", title_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"the old man\".title"),
        FunctionDefinition::new("replace", "replace every occurrence of a text", replace_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Fixed(2))
            .with_example("\"a-b-c\".replace(\"-\",\"_\")"),
        FunctionDefinition::new("sub", "characters from..to, negative counts from the end", sub_eval)
            .with_args(&["from", "to"])
            .with_arity(Arity::Range(0, Some(2)))
            .with_example("\"abcdef\".sub[1,4]"),
        FunctionDefinition::new("index", "position of the first argument found, -1 if none", index_eval)
            .with_args(&["text", "..."])
            .with_arity(Arity::Range(1, None))
            .with_example("\"2024-05-01\".index(\"-\")"),
        FunctionDefinition::new("len", "length in characters, or number of list items", len_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("\"abc\".len"),
        FunctionDefinition::new("str", "string form", str_eval)
            .with_arity(Arity::Fixed(0))
            .with_example("12.str"),
        FunctionDefinition::new("decode", "decode text read with the wrong encoding", decode_eval)
            .with_args(&["encoding"])
            .with_arity(Arity::Fixed(1))
            .with_example("\"cafÃ©\".decode(\"utf-8\")"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing() {
        assert_eq!(capitalize("hELLO world"), "Hello world");
        assert_eq!(capitalize(""), "");
        assert_eq!(title_case("the old-man's sea"), "The Old-Man'S Sea");
    }

    #[test]
    fn decoding() {
        assert_eq!(decode("cafÃ©", "utf-8").unwrap(), "café");
        assert_eq!(decode("caf\u{e9}", "cp1252").unwrap(), "café");
        assert_eq!(decode("\u{80}uro", "cp1252").unwrap(), "€uro");
        assert_eq!(decode("plain", "latin1").unwrap(), "plain");

        let err = decode("abc", "no-such-encoding").unwrap_err();
        assert_eq!(err.to_string(), "decode: unknown encoding \"no-such-encoding\"");
        assert!(decode("€", "cp1252").is_err());
        assert!(decode("\u{ff}", "utf-8").is_err());
    }
}
