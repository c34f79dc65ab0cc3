use std::mem;

use crate::vm::chunk::Chunk;
use crate::vm::table::Table;
use crate::vm::value::Value;

/// Index handle into the heap's object arena.
///
/// All inter-object links are handles rather than owned references, so
/// the freely cyclic object graph (closures, upvalues, classes,
/// instances) is owned by the arena alone and reclaimed by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcRef(u32);

impl GcRef {
    pub(crate) fn new(index: usize) -> GcRef {
        GcRef(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heap object: the shared header (GC mark flag) plus one of the eight
/// concrete object kinds. The C-style intrusive all-objects list is
/// subsumed by the arena slot index.
#[derive(Debug)]
pub struct Obj {
    pub marked: bool,
    pub kind: ObjKind,
}

#[derive(Debug)]
pub enum ObjKind {
    Str(StrObj),
    Function(FunctionObj),
    Native(NativeObj),
    Upvalue(UpvalueObj),
    Closure(ClosureObj),
    Class(ClassObj),
    Instance(InstanceObj),
    BoundMethod(BoundMethodObj),
}

/// An immutable, interned string with its precomputed FNV-1a hash.
#[derive(Debug)]
pub struct StrObj {
    pub chars: String,
    pub hash: u32,
}

/// A compiled function template. `name` is `None` for the implicit
/// top-level script function.
#[derive(Debug)]
pub struct FunctionObj {
    pub arity: usize,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    pub name: Option<GcRef>,
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A host function exposed to scripts through the globals table.
#[derive(Debug)]
pub struct NativeObj {
    pub name: &'static str,
    pub function: NativeFn,
}

/// An upvalue bridges a closure to a variable from an enclosing function.
/// While the variable is still live on the value stack the upvalue is
/// `Open` on its absolute slot index; when the slot leaves scope the
/// value migrates into the upvalue itself.
#[derive(Debug, Clone, Copy)]
pub enum UpvalueState {
    Open(usize),
    Closed(Value),
}

/// `next` threads the VM's list of open upvalues, sorted by descending
/// stack slot. It is `None` once the upvalue is closed.
#[derive(Debug)]
pub struct UpvalueObj {
    pub state: UpvalueState,
    pub next: Option<GcRef>,
}

/// A function template paired with its captured upvalues.
#[derive(Debug)]
pub struct ClosureObj {
    pub function: GcRef,
    pub upvalues: Vec<GcRef>,
}

#[derive(Debug)]
pub struct ClassObj {
    pub name: GcRef,
    pub methods: Table,
}

#[derive(Debug)]
pub struct InstanceObj {
    pub class: GcRef,
    pub fields: Table,
}

/// A method closure bound to the receiver it was accessed on.
#[derive(Debug)]
pub struct BoundMethodObj {
    pub receiver: Value,
    pub method: GcRef,
}

impl Obj {
    pub fn new(kind: ObjKind) -> Obj {
        Obj {
            marked: false,
            kind,
        }
    }

    /// Approximate heap footprint, used for the collector's allocation
    /// accounting. Payload buffers are measured by capacity.
    pub fn size_estimate(&self) -> usize {
        let payload = match &self.kind {
            ObjKind::Str(s) => s.chars.capacity(),
            ObjKind::Function(f) => {
                f.chunk.code.capacity()
                    + f.chunk.lines.capacity() * mem::size_of::<usize>()
                    + f.chunk.constants.capacity() * mem::size_of::<Value>()
            }
            ObjKind::Native(_) => 0,
            ObjKind::Upvalue(_) => 0,
            ObjKind::Closure(c) => c.upvalues.capacity() * mem::size_of::<GcRef>(),
            ObjKind::Class(c) => c.methods.byte_size(),
            ObjKind::Instance(i) => i.fields.byte_size(),
            ObjKind::BoundMethod(_) => 0,
        };
        mem::size_of::<Obj>() + payload
    }

    /// One-word kind name for GC tracing output.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ObjKind::Str(_) => "string",
            ObjKind::Function(_) => "function",
            ObjKind::Native(_) => "native",
            ObjKind::Upvalue(_) => "upvalue",
            ObjKind::Closure(_) => "closure",
            ObjKind::Class(_) => "class",
            ObjKind::Instance(_) => "instance",
            ObjKind::BoundMethod(_) => "bound method",
        }
    }
}
