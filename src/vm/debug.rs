//! Chunk disassembler, reachable from `--dump-bytecode` and from tests.

use std::fmt::Write;

use crate::vm::chunk::{Chunk, OpCode};
use crate::vm::heap::Heap;
use crate::vm::object::{GcRef, ObjKind};
use crate::vm::value::Value;

/// Render a function's chunk followed by every function nested in its
/// constant pool, mirroring the order they finished compiling.
pub fn disassemble(heap: &Heap, function: GcRef) -> String {
    let mut out = String::new();
    let name = heap.format_value(Value::Obj(function));
    let chunk = &heap.function(function).chunk;

    let _ = writeln!(out, "== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(heap, chunk, offset, &mut out);
    }

    for constant in &chunk.constants {
        if let Some(r) = constant.as_obj() {
            if matches!(heap.get(r).kind, ObjKind::Function(_)) {
                out.push_str(&disassemble(heap, r));
            }
        }
    }
    out
}

/// Append one decoded instruction and return the offset of the next.
pub fn disassemble_instruction(
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
    out: &mut String,
) -> usize {
    let _ = write!(out, "{:04} ", offset);
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.lines[offset]);
    }

    let op = match OpCode::from_byte(chunk.code[offset]) {
        Some(op) => op,
        None => {
            let _ = writeln!(out, "Unknown opcode {}", chunk.code[offset]);
            return offset + 1;
        }
    };

    match op {
        OpCode::Constant
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal
        | OpCode::GetProperty
        | OpCode::SetProperty
        | OpCode::GetSuper
        | OpCode::Class
        | OpCode::Method => constant_instruction(heap, chunk, op, offset, out),
        OpCode::GetLocal
        | OpCode::SetLocal
        | OpCode::GetUpvalue
        | OpCode::SetUpvalue
        | OpCode::Call => byte_instruction(chunk, op, offset, out),
        OpCode::Jump | OpCode::JumpIfFalse => jump_instruction(chunk, op, 1, offset, out),
        OpCode::Loop => jump_instruction(chunk, op, -1, offset, out),
        OpCode::Invoke | OpCode::SuperInvoke => invoke_instruction(heap, chunk, op, offset, out),
        OpCode::Closure => closure_instruction(heap, chunk, offset, out),
        _ => {
            let _ = writeln!(out, "{}", op.name());
            offset + 1
        }
    }
}

fn constant_instruction(
    heap: &Heap,
    chunk: &Chunk,
    op: OpCode,
    offset: usize,
    out: &mut String,
) -> usize {
    let index = chunk.code[offset + 1] as usize;
    let rendered = heap.format_value(chunk.constants[index]);
    let _ = writeln!(out, "{:<16} {:4} '{}'", op.name(), index, rendered);
    offset + 2
}

fn byte_instruction(chunk: &Chunk, op: OpCode, offset: usize, out: &mut String) -> usize {
    let slot = chunk.code[offset + 1];
    let _ = writeln!(out, "{:<16} {:4}", op.name(), slot);
    offset + 2
}

fn jump_instruction(
    chunk: &Chunk,
    op: OpCode,
    sign: i64,
    offset: usize,
    out: &mut String,
) -> usize {
    let jump = ((chunk.code[offset + 1] as u16) << 8 | chunk.code[offset + 2] as u16) as i64;
    let target = offset as i64 + 3 + sign * jump;
    let _ = writeln!(out, "{:<16} {:4} -> {}", op.name(), offset, target);
    offset + 3
}

fn invoke_instruction(
    heap: &Heap,
    chunk: &Chunk,
    op: OpCode,
    offset: usize,
    out: &mut String,
) -> usize {
    let index = chunk.code[offset + 1] as usize;
    let arg_count = chunk.code[offset + 2];
    let rendered = heap.format_value(chunk.constants[index]);
    let _ = writeln!(
        out,
        "{:<16} ({} args) {:4} '{}'",
        op.name(),
        arg_count,
        index,
        rendered
    );
    offset + 3
}

fn closure_instruction(heap: &Heap, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let mut offset = offset + 1;
    let index = chunk.code[offset] as usize;
    offset += 1;
    let function = chunk.constants[index].as_obj().unwrap();
    let _ = writeln!(
        out,
        "{:<16} {:4} {}",
        "CLOSURE",
        index,
        heap.format_value(chunk.constants[index])
    );

    for _ in 0..heap.function(function).upvalue_count {
        let is_local = chunk.code[offset] != 0;
        let slot = chunk.code[offset + 1];
        let _ = writeln!(
            out,
            "{:04}    |                     {} {}",
            offset,
            if is_local { "local" } else { "upvalue" },
            slot
        );
        offset += 2;
    }
    offset
}
