//! Line-oriented parser for the textual IR form.
//!
//! ```text
//! fn max(a, b) {
//! entry:
//!   %c = cmp.lt a, b
//!   br %c, take_b, take_a
//! take_b:
//!   jmp done
//! take_a:
//!   jmp done
//! done:
//!   %m = phi [take_b: b], [take_a: a]
//!   ret %m
//! }
//! ```
//!
//! Labels and value names may be referenced before they are defined
//! (branch targets, loop-carried phi operands), so each function is
//! parsed in two passes: the first collects block labels and value
//! names, the second resolves instructions.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::{
    ArgId, BasicBlock, BinaryOp, BlockId, CmpOp, Function, InstId, InstKind, Instruction, Operand,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: unknown value `{name}`")]
    UnknownValue { line: usize, name: String },
    #[error("line {line}: unknown block `{name}`")]
    UnknownBlock { line: usize, name: String },
    #[error("function `{function}` has no blocks")]
    EmptyFunction { function: String },
    #[error("block `{label}` in function `{function}` does not end in a terminator")]
    Unterminated { function: String, label: String },
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.into(),
    }
}

/// Parse every function in `source`.
pub fn parse_module(source: &str) -> Result<Vec<Function>, ParseError> {
    let mut functions = Vec::new();
    let mut lines = source.lines().enumerate().peekable();
    while let Some(&(lineno, raw)) = lines.peek() {
        let line = strip_comment(raw);
        if line.is_empty() {
            lines.next();
            continue;
        }
        if !line.starts_with("fn ") {
            return Err(syntax(lineno + 1, format!("expected `fn`, found `{line}`")));
        }
        // Collect the function's lines up to the closing brace.
        let mut body: Vec<(usize, &str)> = Vec::new();
        let mut closed = false;
        for (n, raw) in lines.by_ref() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }
            body.push((n + 1, line));
            if line == "}" {
                closed = true;
                break;
            }
        }
        if !closed {
            return Err(syntax(lineno + 1, "unclosed function body"));
        }
        body.pop(); // drop the `}`
        functions.push(parse_one(&body)?);
    }
    Ok(functions)
}

/// Parse a source containing exactly one function.
pub fn parse_function(source: &str) -> Result<Function, ParseError> {
    let mut functions = parse_module(source)?;
    match functions.len() {
        1 => Ok(functions.remove(0)),
        n => Err(syntax(1, format!("expected exactly one function, found {n}"))),
    }
}

struct Names {
    params: FxHashMap<String, ArgId>,
    blocks: FxHashMap<String, BlockId>,
    values: FxHashMap<String, InstId>,
}

fn parse_one(body: &[(usize, &str)]) -> Result<Function, ParseError> {
    let (header_line, header) = body[0];
    let (name, params) = parse_header(header_line, header)?;

    let mut names = Names {
        params: params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), ArgId(i as u32)))
            .collect(),
        blocks: FxHashMap::default(),
        values: FxHashMap::default(),
    };

    // First pass: assign block and instruction ids in textual order.
    let mut blocks: Vec<BasicBlock> = Vec::new();
    let mut inst_count: u32 = 0;
    for &(lineno, line) in &body[1..] {
        if let Some(label) = line.strip_suffix(':') {
            let id = BlockId(blocks.len() as u32);
            if names.blocks.insert(label.to_string(), id).is_some() {
                return Err(syntax(lineno, format!("duplicate block label `{label}`")));
            }
            blocks.push(BasicBlock {
                id,
                label: label.to_string(),
                insts: Vec::new(),
                preds: Vec::new(),
                succs: Vec::new(),
            });
        } else {
            if blocks.is_empty() {
                return Err(syntax(lineno, "instruction before first block label"));
            }
            let id = InstId(inst_count);
            inst_count += 1;
            blocks.last_mut().unwrap().insts.push(id);
            if let Some((lhs, _)) = line.split_once('=') {
                let value = lhs.trim();
                if !value.starts_with('%') {
                    return Err(syntax(lineno, "result names must start with `%`"));
                }
                if names.values.insert(value.to_string(), id).is_some() {
                    return Err(syntax(lineno, format!("value `{value}` defined twice")));
                }
            }
        }
    }
    if blocks.is_empty() {
        return Err(ParseError::EmptyFunction { function: name });
    }

    // Second pass: resolve each instruction line.
    let mut insts: Vec<Instruction> = Vec::new();
    for &(lineno, line) in &body[1..] {
        if line.ends_with(':') {
            continue;
        }
        insts.push(parse_inst(lineno, line, &names)?);
    }

    let mut function = Function {
        name,
        params,
        blocks,
        insts,
    };
    for block in &function.blocks {
        let terminated = block
            .insts
            .last()
            .is_some_and(|last| function.insts[last.index()].kind.is_terminator());
        if !terminated {
            return Err(ParseError::Unterminated {
                function: function.name.clone(),
                label: block.label.clone(),
            });
        }
    }
    function.compute_edges();
    Ok(function)
}

fn parse_header(lineno: usize, line: &str) -> Result<(String, Vec<String>), ParseError> {
    let rest = line
        .strip_prefix("fn ")
        .and_then(|r| r.strip_suffix('{'))
        .ok_or_else(|| syntax(lineno, "expected `fn name(params) {`"))?
        .trim();
    let open = rest
        .find('(')
        .ok_or_else(|| syntax(lineno, "missing `(` in function header"))?;
    let close = rest
        .rfind(')')
        .ok_or_else(|| syntax(lineno, "missing `)` in function header"))?;
    let name = rest[..open].trim();
    if name.is_empty() {
        return Err(syntax(lineno, "missing function name"));
    }
    let params: Vec<String> = rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.to_string(), params))
}

fn parse_inst(lineno: usize, line: &str, names: &Names) -> Result<Instruction, ParseError> {
    let (name, rest) = match line.split_once('=') {
        Some((lhs, rhs)) => (lhs.trim().to_string(), rhs.trim()),
        None => (String::new(), line),
    };
    let (opcode, args) = match rest.split_once(' ') {
        Some((op, args)) => (op, args.trim()),
        None => (rest, ""),
    };

    let kind = match opcode {
        "add" | "sub" | "mul" | "div" => {
            let op = match opcode {
                "add" => BinaryOp::Add,
                "sub" => BinaryOp::Sub,
                "mul" => BinaryOp::Mul,
                _ => BinaryOp::Div,
            };
            let (lhs, rhs) = two_operands(lineno, args, names)?;
            InstKind::Binary { op, lhs, rhs }
        }
        _ if opcode.starts_with("cmp.") => {
            let op = match &opcode[4..] {
                "eq" => CmpOp::Eq,
                "ne" => CmpOp::Ne,
                "lt" => CmpOp::Lt,
                "le" => CmpOp::Le,
                "gt" => CmpOp::Gt,
                "ge" => CmpOp::Ge,
                other => return Err(syntax(lineno, format!("unknown comparison `{other}`"))),
            };
            let (lhs, rhs) = two_operands(lineno, args, names)?;
            InstKind::Cmp { op, lhs, rhs }
        }
        "phi" => {
            let mut incoming = Vec::new();
            for edge in split_args(args) {
                let inner = edge
                    .strip_prefix('[')
                    .and_then(|e| e.strip_suffix(']'))
                    .ok_or_else(|| syntax(lineno, "phi edges use `[block: value]`"))?;
                let (block, value) = inner
                    .split_once(':')
                    .ok_or_else(|| syntax(lineno, "phi edges use `[block: value]`"))?;
                let block = resolve_block(lineno, block.trim(), names)?;
                let value = resolve_operand(lineno, value.trim(), names)?;
                incoming.push((block, value));
            }
            if incoming.is_empty() {
                return Err(syntax(lineno, "phi needs at least one incoming edge"));
            }
            InstKind::Phi { incoming }
        }
        "br" => {
            let parts = split_args(args);
            if parts.len() != 3 {
                return Err(syntax(lineno, "br takes `cond, then, else`"));
            }
            InstKind::Branch {
                cond: resolve_operand(lineno, &parts[0], names)?,
                then_dest: resolve_block(lineno, &parts[1], names)?,
                else_dest: resolve_block(lineno, &parts[2], names)?,
            }
        }
        "jmp" => InstKind::Jump {
            dest: resolve_block(lineno, args, names)?,
        },
        "ret" => InstKind::Ret {
            value: if args.is_empty() {
                None
            } else {
                Some(resolve_operand(lineno, args, names)?)
            },
        },
        other => return Err(syntax(lineno, format!("unknown opcode `{other}`"))),
    };

    if kind.produces_value() && name.is_empty() {
        return Err(syntax(lineno, format!("`{opcode}` must name its result")));
    }
    if !kind.produces_value() && !name.is_empty() {
        return Err(syntax(lineno, format!("`{opcode}` does not produce a value")));
    }
    Ok(Instruction { name, kind })
}

/// Split a comma-separated argument list, respecting `[...]` phi edges.
fn split_args(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in args.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn two_operands(
    lineno: usize,
    args: &str,
    names: &Names,
) -> Result<(Operand, Operand), ParseError> {
    let parts = split_args(args);
    if parts.len() != 2 {
        return Err(syntax(lineno, "expected two operands"));
    }
    Ok((
        resolve_operand(lineno, &parts[0], names)?,
        resolve_operand(lineno, &parts[1], names)?,
    ))
}

fn resolve_operand(lineno: usize, token: &str, names: &Names) -> Result<Operand, ParseError> {
    if token.starts_with('%') {
        return names
            .values
            .get(token)
            .map(|&id| Operand::Inst(id))
            .ok_or_else(|| ParseError::UnknownValue {
                line: lineno,
                name: token.to_string(),
            });
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(Operand::Const(value));
    }
    names
        .params
        .get(token)
        .map(|&id| Operand::Arg(id))
        .ok_or_else(|| ParseError::UnknownValue {
            line: lineno,
            name: token.to_string(),
        })
}

fn resolve_block(lineno: usize, token: &str, names: &Names) -> Result<BlockId, ParseError> {
    names
        .blocks
        .get(token)
        .copied()
        .ok_or_else(|| ParseError::UnknownBlock {
            line: lineno,
            name: token.to_string(),
        })
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: &str = "\
fn max(a, b) {
entry:
  %c = cmp.lt a, b
  br %c, take_b, take_a
take_b:
  jmp done
take_a:
  jmp done
done:
  %m = phi [take_b: b], [take_a: a]
  ret %m
}
";

    #[test]
    fn parses_diamond() {
        let f = parse_function(MAX).unwrap();
        assert_eq!(f.name, "max");
        assert_eq!(f.params, vec!["a", "b"]);
        assert_eq!(f.blocks.len(), 4);
        assert_eq!(f.num_insts(), 6);
        let entry = f.block(BlockId::ENTRY);
        assert_eq!(entry.succs.len(), 2);
        let done = &f.blocks[3];
        assert_eq!(done.preds.len(), 2);
    }

    #[test]
    fn display_round_trips() {
        let f = parse_function(MAX).unwrap();
        let printed = f.to_string();
        let again = parse_function(&printed).unwrap();
        assert_eq!(f, again);
    }

    #[test]
    fn forward_references_resolve() {
        let src = "\
fn count(n) {
entry:
  jmp head
head:
  %i = phi [entry: 0], [body: %next]
  %c = cmp.lt %i, n
  br %c, body, done
body:
  %next = add %i, 1
  jmp head
done:
  ret %i
}
";
        let f = parse_function(src).unwrap();
        assert_eq!(f.blocks.len(), 4);
        // The phi's second incoming operand is defined later in the text.
        let head = &f.blocks[1];
        let phi = f.inst(head.insts[0]);
        assert!(matches!(phi.kind, InstKind::Phi { .. }));
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let src = "\
; leading comment
fn id(x) {
entry:
  ret x ; trailing comment
}
";
        let f = parse_function(src).unwrap();
        assert_eq!(f.num_insts(), 1);
    }

    #[test]
    fn unknown_value_is_an_error() {
        let src = "\
fn f(a) {
entry:
  %x = add a, %missing
  ret %x
}
";
        let err = parse_function(src).unwrap_err();
        assert!(matches!(err, ParseError::UnknownValue { .. }));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let src = "\
fn f(a) {
entry:
  %x = add a, 1
}
";
        let err = parse_function(src).unwrap_err();
        assert!(matches!(err, ParseError::Unterminated { .. }));
    }

    #[test]
    fn module_with_two_functions() {
        let src = "\
fn one() {
entry:
  ret 1
}

fn two() {
entry:
  ret 2
}
";
        let fs = parse_module(src).unwrap();
        assert_eq!(fs.len(), 2);
        assert_eq!(fs[1].name, "two");
    }
}
