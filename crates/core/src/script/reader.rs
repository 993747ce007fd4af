use crate::av::ActiveValue;
use crate::cursor::Cursor;
use crate::domain::Domain;
use crate::error::{invalid_data, VnError, VnResult};
use crate::registry::{OpDef, OpPath, OpcodeTable};
use crate::text::TextCodec;
use crate::token::{ChoiceEntry, ConvRef, EsRef, Field, FnRef, Operand};

use super::ScriptFile;

/// Cursor over one chunk of a script file, with the reads that resolve
/// references against the file's tables.
pub struct ChunkReader<'a> {
    cursor: Cursor,
    script: &'a ScriptFile,
    codec: TextCodec,
}

impl<'a> ChunkReader<'a> {
    pub fn new(script: &'a ScriptFile, chunk: Domain) -> Self {
        Self {
            cursor: Cursor::new(chunk),
            script,
            codec: script.game().codec(),
        }
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub fn at_end(&self) -> bool {
        self.cursor.at_end()
    }

    pub fn read_av(&mut self) -> VnResult<ActiveValue> {
        ActiveValue::parse(&mut self.cursor)
    }

    /// Reads an event-script reference. Data references blacklist their
    /// target so it is never tokenized as code.
    pub fn read_esr(&mut self, data: bool) -> VnResult<EsRef> {
        let index = self.cursor.read_u16()?;
        check_index("event script", index, self.script.event_count())?;
        if data {
            self.script.blacklist(index);
        }
        Ok(EsRef { index, data })
    }

    pub fn read_convr(&mut self) -> VnResult<ConvRef> {
        let index = self.cursor.read_u16()?;
        check_index("conversation", index, self.script.conv_count())?;
        Ok(ConvRef { index })
    }

    /// Four auxiliary values, then the filename index.
    pub fn read_fnr(&mut self) -> VnResult<FnRef> {
        let aux = [
            self.read_av()?,
            self.read_av()?,
            self.read_av()?,
            self.read_av()?,
        ];
        let aux = if aux.iter().all(ActiveValue::is_empty) {
            None
        } else {
            Some(Box::new(aux))
        };
        let index = self.cursor.read_u16()?;
        check_index("filename", index, self.script.filename_count())?;
        Ok(FnRef { index, aux })
    }

    pub fn read_text(&mut self, term: u8) -> VnResult<String> {
        self.codec.read_string_fixedterm(&mut self.cursor, term)
    }

    /// Reads text and leaves its terminator in the stream.
    pub fn read_text_open(&mut self) -> VnResult<String> {
        let (text, _) = self.codec.read_string(&mut self.cursor)?;
        self.cursor.seek_back(1)?;
        Ok(text)
    }

    pub fn read_ascii(&mut self, term: u8) -> VnResult<Vec<u8>> {
        let start = self.cursor.pos();
        let text = self.read_text(term)?;
        if !text.is_ascii() {
            return Err(invalid_data(start, format!("expected ASCII, got {text:?}")));
        }
        Ok(text.into_bytes())
    }

    fn read_choice_entry(&mut self) -> VnResult<ChoiceEntry> {
        let start = self.cursor.pos();
        match self.cursor.read_u8()? {
            0x00 => Ok(ChoiceEntry::Question {
                id: self.cursor.read_u16()?,
            }),
            0x01 => Ok(ChoiceEntry::Option {
                display: None,
                text: self.read_text(0x01)?,
            }),
            0x02 => {
                let display = Some(self.read_av()?);
                Ok(ChoiceEntry::Option {
                    display,
                    text: self.read_text(0x01)?,
                })
            }
            other => Err(invalid_data(
                start,
                format!("unknown choice entry type {other:#04x}"),
            )),
        }
    }

    fn read_field(&mut self, field: Field, out: &mut Vec<Operand>) -> VnResult<()> {
        match field {
            Field::Av => out.push(Operand::Av(self.read_av()?)),
            Field::AvN(count) => {
                for _ in 0..count {
                    out.push(Operand::Av(self.read_av()?));
                }
            }
            Field::AvZero => {
                let start = self.cursor.pos();
                let value = self.read_av()?;
                if value.constant_values()? != [0] {
                    return Err(invalid_data(
                        start,
                        format!("expected constant 0, got {value}"),
                    ));
                }
                out.push(Operand::Av(value));
            }
            Field::U8 => out.push(Operand::U8(self.cursor.read_u8()?)),
            Field::U16 => out.push(Operand::U16(self.cursor.read_u16()?)),
            Field::S16 => out.push(Operand::S16(self.cursor.read_s16()?)),
            Field::Bytes(count) => out.push(Operand::Bytes(self.cursor.read(count)?.to_vec())),
            Field::Nulls(count) => self.cursor.eat_nulls(count)?,
            Field::Const(expected) => self.cursor.eat_const(expected)?,
            Field::Esr => out.push(Operand::Esr(self.read_esr(false)?)),
            Field::EsrData => out.push(Operand::Esr(self.read_esr(true)?)),
            Field::Fnr => out.push(Operand::Fnr(self.read_fnr()?)),
            Field::Convr => out.push(Operand::Convr(self.read_convr()?)),
            Field::CStr(term) => out.push(Operand::CStr(self.cursor.read_bytes_fixedterm(term)?)),
            Field::Text(term) => out.push(Operand::Text(self.read_text(term)?)),
            Field::TextOpen => out.push(Operand::Text(self.read_text_open()?)),
            Field::Ascii(term) => out.push(Operand::Ascii(self.read_ascii(term)?)),
            Field::ChoiceEntry => out.push(Operand::Choice(self.read_choice_entry()?)),
            Field::End => self.cursor.set_end()?,
        }
        Ok(())
    }

    /// Reads operands according to `shape`.
    pub fn read_shape(&mut self, shape: &[Field]) -> VnResult<Vec<Operand>> {
        let mut operands = Vec::with_capacity(shape.len());
        for field in shape {
            self.read_field(*field, &mut operands)?;
        }
        Ok(operands)
    }

    /// Reads one opcode and its operands.
    pub fn read_op<A>(
        &mut self,
        table: &OpcodeTable<A>,
    ) -> VnResult<(OpPath, &'static OpDef<A>, Vec<Operand>)> {
        let (path, def) = table.lookup(&mut self.cursor)?;
        let operands = self.read_shape(def.shape)?;
        Ok((path, def, operands))
    }
}

fn check_index(kind: &'static str, index: u16, count: usize) -> VnResult<()> {
    if usize::from(index) >= count {
        return Err(VnError::InvalidReference { kind, index, count });
    }
    Ok(())
}
