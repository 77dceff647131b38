//! Human-readable IR dump. This is a debugging aid, not a wire format;
//! the textual form is not parsed back.

use crate::core::ir::Opcode;
use crate::core::module::Module;
use crate::core::region::RegionId;
use crate::core::value::{DataType, Value};
use std::fmt;
use std::fmt::Write;
use yansi::Paint;

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::Int8 => "i8",
            DataType::Int16 => "i16",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
            DataType::Uint8 => "u8",
            DataType::Uint16 => "u16",
            DataType::Uint32 => "u32",
            DataType::Uint64 => "u64",
            DataType::Float32 => "f32",
            DataType::Float64 => "f64",
            DataType::Vector => "vector",
            DataType::Pointer => "ptr",
            DataType::Array => "array",
            DataType::Struct => "struct",
            DataType::Function => "fn",
        };
        write!(f, "{}", name)
    }
}

impl Opcode {
    /// Lowercase mnemonic used by the dump.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Entry => "entry",
            Opcode::Exit => "exit",
            Opcode::Param => "param",
            Opcode::Lit => "lit",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Gt => "gt",
            Opcode::Gte => "gte",
            Opcode::Lt => "lt",
            Opcode::Lte => "lte",
            Opcode::Eq => "eq",
            Opcode::Neq => "neq",
            Opcode::Band => "band",
            Opcode::Bor => "bor",
            Opcode::Bxor => "bxor",
            Opcode::Bnot => "bnot",
            Opcode::Bshl => "bshl",
            Opcode::Bshr => "bshr",
            Opcode::Ret => "ret",
            Opcode::Function => "function",
            Opcode::Call => "call",
            Opcode::Invoke => "invoke",
            Opcode::Jump => "jump",
            Opcode::Branch => "branch",
            Opcode::From => "from",
            Opcode::Alloc => "alloc",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::AddrOf => "addr_of",
            Opcode::PtrLoad => "ptr_load",
            Opcode::PtrStore => "ptr_store",
            Opcode::PtrAdd => "ptr_add",
            Opcode::Cast => "cast",
            Opcode::ReinterpretCast => "reinterpret_cast",
            Opcode::AtomicLoad => "atomic_load",
            Opcode::AtomicStore => "atomic_store",
            Opcode::AtomicCas => "atomic_cas",
            Opcode::Access => "access",
            Opcode::VectorBuild => "vector_build",
            Opcode::VectorExtract => "vector_extract",
            Opcode::VectorSplat => "vector_splat",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Vector(v) => write!(f, "vector<{} x {}>", v.elem, v.lanes),
            Value::Pointer(v) => write!(f, "ptr<{}>", v.pointee),
            Value::Array(v) => write!(f, "array<{} x {}>", v.elem, v.count),
            Value::Struct(v) => {
                write!(f, "struct{{")?;
                for (i, field) in v.fields.iter().enumerate() {
                    match i {
                        0 => write!(f, "{}", field)?,
                        _ => write!(f, ", {}", field)?,
                    };
                }
                write!(f, "}}")
            }
            Value::Function(v) => {
                write!(f, "fn(")?;
                for (i, param) in v.params.iter().enumerate() {
                    match i {
                        0 => write!(f, "{}", param)?,
                        _ => write!(f, ", {}", param)?,
                    };
                }
                write!(f, ") -> {}", v.return_type.ty())
            }
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            Paint::blue("module").bold(),
            Paint::cyan(self.name())
        )?;
        fmt_region(self, self.root(), f, 1)?;
        fmt_region(self, self.rodata(), f, 1)
    }
}

fn fmt_region(
    module: &Module,
    region: RegionId,
    f: &mut fmt::Formatter,
    depth: usize,
) -> fmt::Result {
    let pad = "  ".repeat(depth);
    writeln!(
        f,
        "{}{} {}:",
        pad,
        Paint::blue("region"),
        Paint::cyan(module.region_name(region))
    )?;
    for &node in module.region(region).nodes() {
        let n = module.node(node);
        let mut line = String::new();
        write!(
            line,
            "{} = {} {}",
            Paint::white(format!("%{}", node.index())),
            Paint::green(n.op.mnemonic()).bold(),
            Paint::magenta(format!("{}", n.ty))
        )?;
        if n.op == Opcode::Lit {
            write!(line, " {}", n.value)?;
        }
        if !n.inputs.is_empty() {
            write!(line, "(")?;
            let last = n.inputs.len() - 1;
            for (i, input) in n.inputs.iter().enumerate() {
                match i == last {
                    true => write!(line, "{}", input)?,
                    false => write!(line, "{}, ", input)?,
                };
            }
            write!(line, ")")?;
        }
        let name = module.strtab().get(n.name).unwrap_or("");
        if !name.is_empty() {
            write!(line, " {}", Paint::cyan(format!("@{}", name)).italic())?;
        }
        writeln!(f, "{}  {}", pad, line)?;
    }
    for &child in module.region(region).children() {
        fmt_region(module, child, f, depth + 1)?;
    }
    Ok(())
}
