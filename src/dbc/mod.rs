//! CAN database (DBC) model, parser and frame decoder.
//!
//! Only the parts of the format needed to decode data frames are understood:
//! messages (`BO_`), signals (`SG_`), value tables (`VAL_`) and signal value
//! types (`SIG_VALTYPE_`). Every other section is skipped.

pub mod catalog;
pub mod decode;
pub mod parser;

pub use catalog::{MessageEntry, SignalCatalog, SignalInfo};
pub use parser::parse_dbc;

use std::collections::BTreeMap;

/// Extended-frame flag carried in bit 31 of a `BO_` id.
pub const EXTENDED_ID_FLAG: u32 = 0x8000_0000;
pub const FRAME_ID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `@1`, Intel
    LittleEndian,
    /// `@0`, Motorola
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    Float32,
    Float64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplex {
    None,
    Multiplexor,
    Multiplexed(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub start_bit: usize,
    pub length: usize,
    pub byte_order: ByteOrder,
    pub is_signed: bool,
    pub value_type: ValueType,
    pub factor: f64,
    pub offset: f64,
    /// factor 與 offset 都是整數值（含 `1.0`）時，解碼結果保持整數
    pub integer_scaling: bool,
    pub minimum: f64,
    pub maximum: f64,
    pub unit: String,
    pub multiplex: Multiplex,
    pub choices: BTreeMap<i64, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub frame_id: u32,
    pub is_extended: bool,
    pub name: String,
    pub length: usize,
    pub sender: String,
    pub signals: Vec<Signal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    pub messages: Vec<Message>,
}

impl Database {
    pub fn message_by_id(&self, frame_id: u32) -> Option<&Message> {
        self.messages.iter().find(|m| m.frame_id == frame_id)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn signal_count(&self) -> usize {
        self.messages.iter().map(|m| m.signals.len()).sum()
    }
}
