use super::{ByteOrder, Message, Multiplex, Signal, ValueType};
use crate::domain::model::SignalValue;
use crate::utils::error::{ConvertError, Result};

impl Message {
    /// 解碼一個資料幀，回傳 (信號索引, 值)，依 DBC 中的信號順序
    ///
    /// Multiplexed signals are only produced when the multiplexor carries
    /// their id. Data shorter than the declared message length is an error.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<(usize, SignalValue)>> {
        if data.len() < self.length {
            return Err(self.decode_error(format!(
                "wrong data size: {} instead of {} bytes",
                data.len(),
                self.length
            )));
        }

        let mux_value = match self
            .signals
            .iter()
            .find(|s| s.multiplex == Multiplex::Multiplexor)
        {
            Some(mux) => Some(
                extract_raw(data, mux)
                    .map_err(|e| self.decode_error(format!("{}: {}", mux.name, e)))?,
            ),
            None => None,
        };

        let mut values = Vec::with_capacity(self.signals.len());
        for (index, signal) in self.signals.iter().enumerate() {
            if let Multiplex::Multiplexed(id) = signal.multiplex {
                if mux_value != Some(id) {
                    continue;
                }
            }
            let value = signal
                .decode(data)
                .map_err(|e| self.decode_error(format!("{}: {}", signal.name, e)))?;
            values.push((index, value));
        }

        Ok(values)
    }

    fn decode_error(&self, message: String) -> ConvertError {
        ConvertError::DecodeError {
            frame_id: self.frame_id,
            message: format!("{} ({})", message, self.name),
        }
    }
}

impl Signal {
    pub fn decode(&self, data: &[u8]) -> std::result::Result<SignalValue, String> {
        let raw = extract_raw(data, self)?;

        match self.value_type {
            ValueType::Float32 => {
                if self.length != 32 {
                    return Err(format!("float32 signal has length {}", self.length));
                }
                let value = f32::from_bits(raw as u32) as f64;
                Ok(SignalValue::Float(value * self.factor + self.offset))
            }
            ValueType::Float64 => {
                if self.length != 64 {
                    return Err(format!("float64 signal has length {}", self.length));
                }
                Ok(SignalValue::Float(
                    f64::from_bits(raw) * self.factor + self.offset,
                ))
            }
            ValueType::Integer => {
                let raw_int: i128 = if self.is_signed {
                    sign_extend(raw, self.length) as i128
                } else {
                    raw as i128
                };

                if let Some(label) = i64::try_from(raw_int)
                    .ok()
                    .and_then(|v| self.choices.get(&v))
                {
                    return Ok(SignalValue::Text(label.clone()));
                }

                if self.integer_scaling {
                    let scaled = raw_int * self.factor as i128 + self.offset as i128;
                    if let Ok(value) = i64::try_from(scaled) {
                        return Ok(SignalValue::Int(value));
                    }
                }
                Ok(SignalValue::Float(raw_int as f64 * self.factor + self.offset))
            }
        }
    }
}

/// 依位元序取出原始位元
fn extract_raw(data: &[u8], signal: &Signal) -> std::result::Result<u64, String> {
    let out_of_range = || {
        format!(
            "bits {}..{} exceed {} data bytes",
            signal.start_bit,
            signal.start_bit + signal.length,
            data.len()
        )
    };
    let bit_at = |pos: usize| -> Option<u64> { data.get(pos / 8).map(|b| ((b >> (pos % 8)) & 1) as u64) };

    let mut raw: u64 = 0;
    match signal.byte_order {
        ByteOrder::LittleEndian => {
            for i in 0..signal.length {
                let bit = bit_at(signal.start_bit + i).ok_or_else(out_of_range)?;
                raw |= bit << i;
            }
        }
        ByteOrder::BigEndian => {
            // start bit 是 MSB；位元編號呈鋸齒狀往下一個位元組前進
            let mut pos = signal.start_bit;
            for i in 0..signal.length {
                let bit = bit_at(pos).ok_or_else(out_of_range)?;
                raw = (raw << 1) | bit;
                if i + 1 < signal.length {
                    if pos % 8 == 0 {
                        pos += 15;
                    } else {
                        pos -= 1;
                    }
                }
            }
        }
    }
    Ok(raw)
}

fn sign_extend(raw: u64, length: usize) -> i64 {
    if length >= 64 {
        return raw as i64;
    }
    let shift = 64 - length;
    ((raw << shift) as i64) >> shift
}
