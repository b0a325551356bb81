//! Action opcodes
//!
//! Opcodes below 0x80 carry no operands; opcodes at or above 0x80 are
//! followed by a little-endian u16 length and that many operand bytes.

/// An action opcode.
///
/// Grouped by the player version that introduced it, matching the wire
/// numbering of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// End of an action block (also acts as return).
    End = 0x00,

    // ==================== Version 3 ====================
    /// Advance the timeline one frame.
    NextFrame = 0x04,
    /// Rewind the timeline one frame.
    PreviousFrame = 0x05,
    /// Resume timeline playback.
    Play = 0x06,
    /// Pause timeline playback.
    Stop = 0x07,
    /// Toggle render quality (ignored).
    ToggleQuality = 0x08,
    /// Stop all playing sounds.
    StopSounds = 0x09,
    /// Jump to an absolute frame.
    GotoFrame = 0x81,
    /// Open a URL in a target window.
    GetUrl = 0x83,
    /// Skip actions unless a frame is loaded.
    WaitForFrame = 0x8a,
    /// Redirect subsequent actions at a named clip.
    SetTarget = 0x8b,
    /// Jump to a labeled frame.
    GotoLabel = 0x8c,

    // ==================== Version 4 ====================
    /// Push one or more literal records.
    Push = 0x96,
    /// Discard the top of the stack.
    Pop = 0x17,
    /// Numeric addition.
    Add = 0x0a,
    /// Numeric subtraction.
    Subtract = 0x0b,
    /// Numeric multiplication.
    Multiply = 0x0c,
    /// Numeric division.
    Divide = 0x0d,
    /// Numeric equality.
    Equals = 0x0e,
    /// Numeric less-than.
    Less = 0x0f,
    /// Logical and (numeric truth).
    And = 0x10,
    /// Logical or (numeric truth).
    Or = 0x11,
    /// Boolean negation.
    Not = 0x12,
    /// String equality.
    StringEquals = 0x13,
    /// String length in bytes.
    StringLength = 0x14,
    /// Substring extraction.
    StringExtract = 0x15,
    /// String concatenation.
    StringAdd = 0x21,
    /// String less-than.
    StringLess = 0x29,
    /// String length in characters.
    MbStringLength = 0x31,
    /// Substring extraction in characters.
    MbStringExtract = 0x35,
    /// Truncate a number to an integer.
    ToInteger = 0x18,
    /// First byte of a string.
    CharToAscii = 0x32,
    /// One-character string from a byte value.
    AsciiToChar = 0x33,
    /// First character code of a string.
    MbCharToAscii = 0x36,
    /// One-character string from a character code.
    MbAsciiToChar = 0x37,
    /// Unconditional relative jump.
    Jump = 0x99,
    /// Conditional relative jump.
    If = 0x9d,
    /// Run the actions of another frame.
    Call = 0x9e,
    /// Read a variable.
    GetVariable = 0x1c,
    /// Write a variable.
    SetVariable = 0x1d,
    /// Open a URL with stack-supplied parameters.
    GetUrl2 = 0x9a,
    /// Jump to a stack-supplied frame.
    GotoFrame2 = 0x9f,
    /// Redirect actions at a stack-supplied clip.
    SetTarget2 = 0x20,
    /// Read an indexed movie property.
    GetProperty = 0x22,
    /// Write an indexed movie property.
    SetProperty = 0x23,
    /// Duplicate a sprite.
    CloneSprite = 0x24,
    /// Remove a duplicated sprite.
    RemoveSprite = 0x25,
    /// Begin dragging a clip.
    StartDrag = 0x27,
    /// End a drag operation.
    EndDrag = 0x28,
    /// Skip actions unless a stack-supplied frame is loaded.
    WaitForFrame2 = 0x8d,
    /// Emit a value on the trace channel.
    Trace = 0x26,
    /// Milliseconds since playback started.
    GetTime = 0x34,
    /// Random integer below a bound.
    RandomNumber = 0x30,

    // ==================== Version 5 ====================
    /// Call a named global function.
    CallFunction = 0x3d,
    /// Call a method of an object.
    CallMethod = 0x52,
    /// Install a new constant pool.
    ConstantPool = 0x88,
    /// Define a function (legacy form).
    DefineFunction = 0x9b,
    /// Declare and set a local variable.
    DefineLocal = 0x3c,
    /// Declare a local variable.
    DefineLocal2 = 0x41,
    /// Delete a variable.
    Delete2 = 0x3b,
    /// Abstract equality.
    Equals2 = 0x49,
    /// Read an object property.
    GetMember = 0x4e,
    /// Write an object property.
    SetMember = 0x4f,
    /// Build an array from stack elements.
    InitArray = 0x42,
    /// Build an object from stack pairs.
    InitObject = 0x43,
    /// Construct via a method of an object.
    NewMethod = 0x53,
    /// Construct via a named constructor.
    NewObject = 0x40,
    /// Coerce to number.
    ToNumber = 0x4a,
    /// Coerce to string.
    ToString = 0x4b,
    /// Type name of a value.
    TypeOf = 0x44,
    /// Addition with string concatenation.
    Add2 = 0x47,
    /// Abstract less-than.
    Less2 = 0x48,
    /// Numeric modulo.
    Modulo = 0x3f,
    /// Bitwise and.
    BitAnd = 0x60,
    /// Bitwise or.
    BitOr = 0x61,
    /// Bitwise xor.
    BitXor = 0x62,
    /// Bitwise left shift.
    BitLShift = 0x63,
    /// Bitwise arithmetic right shift.
    BitRShift = 0x64,
    /// Bitwise logical right shift.
    BitURShift = 0x65,
    /// Add one.
    Increment = 0x50,
    /// Subtract one.
    Decrement = 0x51,
    /// Duplicate the top of the stack.
    PushDuplicate = 0x4c,
    /// Return from the current function.
    Return = 0x3e,
    /// Exchange the top two stack values.
    Swap = 0x4d,
    /// Copy the top of the stack into a register.
    StoreRegister = 0x87,

    // ==================== Version 6 ====================
    /// Prototype-chain membership test.
    InstanceOf = 0x54,
    /// Push the enumerable property names of an object.
    Enumerate2 = 0x55,
    /// Strict equality (no coercion).
    StrictEquals = 0x66,
    /// Abstract greater-than.
    Greater = 0x67,
    /// String greater-than.
    StringGreater = 0x68,

    // ==================== Version 7 ====================
    /// Define a function with a private register bank.
    DefineFunction2 = 0x8e,
    /// Wire a subclass prototype to a superclass.
    Extends = 0x69,
}

impl Opcode {
    /// Whether opcode byte `byte` carries a length-prefixed operand block.
    pub fn has_operands(byte: u8) -> bool {
        byte >= 0x80
    }

    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::End,

            0x04 => Self::NextFrame,
            0x05 => Self::PreviousFrame,
            0x06 => Self::Play,
            0x07 => Self::Stop,
            0x08 => Self::ToggleQuality,
            0x09 => Self::StopSounds,
            0x81 => Self::GotoFrame,
            0x83 => Self::GetUrl,
            0x8a => Self::WaitForFrame,
            0x8b => Self::SetTarget,
            0x8c => Self::GotoLabel,

            0x96 => Self::Push,
            0x17 => Self::Pop,
            0x0a => Self::Add,
            0x0b => Self::Subtract,
            0x0c => Self::Multiply,
            0x0d => Self::Divide,
            0x0e => Self::Equals,
            0x0f => Self::Less,
            0x10 => Self::And,
            0x11 => Self::Or,
            0x12 => Self::Not,
            0x13 => Self::StringEquals,
            0x14 => Self::StringLength,
            0x15 => Self::StringExtract,
            0x21 => Self::StringAdd,
            0x29 => Self::StringLess,
            0x31 => Self::MbStringLength,
            0x35 => Self::MbStringExtract,
            0x18 => Self::ToInteger,
            0x32 => Self::CharToAscii,
            0x33 => Self::AsciiToChar,
            0x36 => Self::MbCharToAscii,
            0x37 => Self::MbAsciiToChar,
            0x99 => Self::Jump,
            0x9d => Self::If,
            0x9e => Self::Call,
            0x1c => Self::GetVariable,
            0x1d => Self::SetVariable,
            0x9a => Self::GetUrl2,
            0x9f => Self::GotoFrame2,
            0x20 => Self::SetTarget2,
            0x22 => Self::GetProperty,
            0x23 => Self::SetProperty,
            0x24 => Self::CloneSprite,
            0x25 => Self::RemoveSprite,
            0x27 => Self::StartDrag,
            0x28 => Self::EndDrag,
            0x8d => Self::WaitForFrame2,
            0x26 => Self::Trace,
            0x34 => Self::GetTime,
            0x30 => Self::RandomNumber,

            0x3d => Self::CallFunction,
            0x52 => Self::CallMethod,
            0x88 => Self::ConstantPool,
            0x9b => Self::DefineFunction,
            0x3c => Self::DefineLocal,
            0x41 => Self::DefineLocal2,
            0x3b => Self::Delete2,
            0x49 => Self::Equals2,
            0x4e => Self::GetMember,
            0x4f => Self::SetMember,
            0x42 => Self::InitArray,
            0x43 => Self::InitObject,
            0x53 => Self::NewMethod,
            0x40 => Self::NewObject,
            0x4a => Self::ToNumber,
            0x4b => Self::ToString,
            0x44 => Self::TypeOf,
            0x47 => Self::Add2,
            0x48 => Self::Less2,
            0x3f => Self::Modulo,
            0x60 => Self::BitAnd,
            0x61 => Self::BitOr,
            0x62 => Self::BitXor,
            0x63 => Self::BitLShift,
            0x64 => Self::BitRShift,
            0x65 => Self::BitURShift,
            0x50 => Self::Increment,
            0x51 => Self::Decrement,
            0x4c => Self::PushDuplicate,
            0x3e => Self::Return,
            0x4d => Self::Swap,
            0x87 => Self::StoreRegister,

            0x54 => Self::InstanceOf,
            0x55 => Self::Enumerate2,
            0x66 => Self::StrictEquals,
            0x67 => Self::Greater,
            0x68 => Self::StringGreater,

            0x8e => Self::DefineFunction2,
            0x69 => Self::Extends,

            _ => return None,
        })
    }

    /// Convert to the raw opcode byte.
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// The name of this opcode.
    pub const fn name(self) -> &'static str {
        match self {
            Self::End => "End",
            Self::NextFrame => "NextFrame",
            Self::PreviousFrame => "PreviousFrame",
            Self::Play => "Play",
            Self::Stop => "Stop",
            Self::ToggleQuality => "ToggleQuality",
            Self::StopSounds => "StopSounds",
            Self::GotoFrame => "GotoFrame",
            Self::GetUrl => "GetUrl",
            Self::WaitForFrame => "WaitForFrame",
            Self::SetTarget => "SetTarget",
            Self::GotoLabel => "GotoLabel",
            Self::Push => "Push",
            Self::Pop => "Pop",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Equals => "Equals",
            Self::Less => "Less",
            Self::And => "And",
            Self::Or => "Or",
            Self::Not => "Not",
            Self::StringEquals => "StringEquals",
            Self::StringLength => "StringLength",
            Self::StringExtract => "StringExtract",
            Self::StringAdd => "StringAdd",
            Self::StringLess => "StringLess",
            Self::MbStringLength => "MbStringLength",
            Self::MbStringExtract => "MbStringExtract",
            Self::ToInteger => "ToInteger",
            Self::CharToAscii => "CharToAscii",
            Self::AsciiToChar => "AsciiToChar",
            Self::MbCharToAscii => "MbCharToAscii",
            Self::MbAsciiToChar => "MbAsciiToChar",
            Self::Jump => "Jump",
            Self::If => "If",
            Self::Call => "Call",
            Self::GetVariable => "GetVariable",
            Self::SetVariable => "SetVariable",
            Self::GetUrl2 => "GetUrl2",
            Self::GotoFrame2 => "GotoFrame2",
            Self::SetTarget2 => "SetTarget2",
            Self::GetProperty => "GetProperty",
            Self::SetProperty => "SetProperty",
            Self::CloneSprite => "CloneSprite",
            Self::RemoveSprite => "RemoveSprite",
            Self::StartDrag => "StartDrag",
            Self::EndDrag => "EndDrag",
            Self::WaitForFrame2 => "WaitForFrame2",
            Self::Trace => "Trace",
            Self::GetTime => "GetTime",
            Self::RandomNumber => "RandomNumber",
            Self::CallFunction => "CallFunction",
            Self::CallMethod => "CallMethod",
            Self::ConstantPool => "ConstantPool",
            Self::DefineFunction => "DefineFunction",
            Self::DefineLocal => "DefineLocal",
            Self::DefineLocal2 => "DefineLocal2",
            Self::Delete2 => "Delete2",
            Self::Equals2 => "Equals2",
            Self::GetMember => "GetMember",
            Self::SetMember => "SetMember",
            Self::InitArray => "InitArray",
            Self::InitObject => "InitObject",
            Self::NewMethod => "NewMethod",
            Self::NewObject => "NewObject",
            Self::ToNumber => "ToNumber",
            Self::ToString => "ToString",
            Self::TypeOf => "TypeOf",
            Self::Add2 => "Add2",
            Self::Less2 => "Less2",
            Self::Modulo => "Modulo",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::BitLShift => "BitLShift",
            Self::BitRShift => "BitRShift",
            Self::BitURShift => "BitURShift",
            Self::Increment => "Increment",
            Self::Decrement => "Decrement",
            Self::PushDuplicate => "PushDuplicate",
            Self::Return => "Return",
            Self::Swap => "Swap",
            Self::StoreRegister => "StoreRegister",
            Self::InstanceOf => "InstanceOf",
            Self::Enumerate2 => "Enumerate2",
            Self::StrictEquals => "StrictEquals",
            Self::Greater => "Greater",
            Self::StringGreater => "StringGreater",
            Self::DefineFunction2 => "DefineFunction2",
            Self::Extends => "Extends",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let ops = [
            Opcode::Push,
            Opcode::Add,
            Opcode::CallFunction,
            Opcode::Jump,
            Opcode::Return,
            Opcode::DefineFunction2,
        ];
        for op in ops {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Opcode::from_byte(0x2a), None);
        assert_eq!(Opcode::from_byte(0xff), None);
    }

    #[test]
    fn test_operand_block_rule() {
        assert!(Opcode::has_operands(Opcode::Push.to_byte()));
        assert!(Opcode::has_operands(Opcode::Jump.to_byte()));
        assert!(!Opcode::has_operands(Opcode::Add.to_byte()));
        assert!(!Opcode::has_operands(Opcode::Return.to_byte()));
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(Opcode::Push.name(), "Push");
        assert_eq!(Opcode::ConstantPool.name(), "ConstantPool");
    }
}
