//! Class-file parser for classpath entries.
//!
//! Reads just enough of a foreign class file to answer resolution queries:
//! access flags, super class, interfaces, and field/method signatures.
//! Attributes other than `Signature` and `Exceptions` are skipped by their
//! length prefix.

use super::constpool::tags;
use crate::common::{Error, Result};

/// A parsed constant pool entry; only the variants resolution needs carry
/// data, everything else is recorded as `Other` to keep indices aligned.
#[derive(Debug, Clone)]
enum PoolEntry {
    Utf8(String),
    Class(u16),
    Other,
    /// Phantom second slot of a long/double
    Unusable,
}

#[derive(Debug, Clone)]
pub struct ParsedField {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
}

/// Body of a parsed `Code` attribute.
#[derive(Debug, Clone)]
pub struct ParsedCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    /// (start_pc, end_pc, handler_pc, catch_type)
    pub exception_table: Vec<(u16, u16, u16, u16)>,
}

#[derive(Debug, Clone)]
pub struct ParsedMethod {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub code: Option<ParsedCode>,
}

/// Resolution-level description of a class.
#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub version: (u16, u16),
    pub access_flags: u16,
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ParsedField>,
    pub methods: Vec<ParsedMethod>,
}

pub struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
    pool: Vec<PoolEntry>,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, pool: Vec::new() }
    }

    fn bad(&self, what: &str) -> Error {
        Error::invariant("class reader", format!("{} at offset {}", what, self.pos))
    }

    fn u1(&mut self) -> Result<u8> {
        let v = *self.data.get(self.pos).ok_or_else(|| self.bad("truncated class file"))?;
        self.pos += 1;
        Ok(v)
    }

    fn u2(&mut self) -> Result<u16> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 2)
            .ok_or_else(|| self.bad("truncated class file"))?;
        self.pos += 2;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u4(&mut self) -> Result<u32> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.bad("truncated class file"))?;
        self.pos += 4;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.data.len() {
            return Err(self.bad("truncated class file"));
        }
        self.pos += n;
        Ok(())
    }

    fn utf8(&self, idx: u16) -> Result<String> {
        match self.pool.get(idx as usize) {
            Some(PoolEntry::Utf8(s)) => Ok(s.clone()),
            _ => Err(Error::invariant("class reader", format!("index {} is not a Utf8", idx))),
        }
    }

    fn class_name(&self, idx: u16) -> Result<Option<String>> {
        if idx == 0 {
            return Ok(None);
        }
        match self.pool.get(idx as usize) {
            Some(PoolEntry::Class(name_idx)) => Ok(Some(self.utf8(*name_idx)?)),
            _ => Err(Error::invariant("class reader", format!("index {} is not a Class", idx))),
        }
    }

    fn read_pool(&mut self) -> Result<()> {
        let count = self.u2()?;
        self.pool = Vec::with_capacity(count as usize);
        self.pool.push(PoolEntry::Unusable); // index 0
        let mut i = 1;
        while i < count {
            let tag = self.u1()?;
            let entry = match tag {
                tags::UTF8 => {
                    let len = self.u2()? as usize;
                    let bytes = self
                        .data
                        .get(self.pos..self.pos + len)
                        .ok_or_else(|| self.bad("truncated utf8"))?;
                    self.pos += len;
                    // modified UTF-8 is close enough to UTF-8 for the names
                    // resolution cares about; anything else is replaced
                    PoolEntry::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                tags::INTEGER | tags::FLOAT => {
                    self.skip(4)?;
                    PoolEntry::Other
                }
                tags::LONG | tags::DOUBLE => {
                    self.skip(8)?;
                    self.pool.push(PoolEntry::Other);
                    self.pool.push(PoolEntry::Unusable);
                    i += 2;
                    continue;
                }
                tags::CLASS => PoolEntry::Class(self.u2()?),
                tags::STRING | tags::METHOD_TYPE => {
                    self.skip(2)?;
                    PoolEntry::Other
                }
                tags::FIELDREF
                | tags::METHODREF
                | tags::INTERFACE_METHODREF
                | tags::NAME_AND_TYPE
                | tags::INVOKE_DYNAMIC => {
                    self.skip(4)?;
                    PoolEntry::Other
                }
                tags::METHOD_HANDLE => {
                    self.skip(3)?;
                    PoolEntry::Other
                }
                // Dynamic, Module, Package (Java 9+) all carry 4 bytes
                17 | 19 | 20 => {
                    self.skip(4)?;
                    PoolEntry::Other
                }
                other => {
                    return Err(Error::invariant(
                        "class reader",
                        format!("unknown constant pool tag {}", other),
                    ))
                }
            };
            self.pool.push(entry);
            i += 1;
        }
        Ok(())
    }

    /// Read the attribute table, keeping `Signature`, `Exceptions` and
    /// `Code`; everything else is skipped by its length prefix.
    fn read_attributes(&mut self) -> Result<(Option<String>, Vec<String>, Option<ParsedCode>)> {
        let count = self.u2()?;
        let mut signature = None;
        let mut exceptions = Vec::new();
        let mut code = None;
        for _ in 0..count {
            let name_idx = self.u2()?;
            let length = self.u4()? as usize;
            let end = self.pos + length;
            let name = self.utf8(name_idx)?;
            match name.as_str() {
                "Signature" => {
                    let sig_idx = self.u2()?;
                    signature = Some(self.utf8(sig_idx)?);
                }
                "Exceptions" => {
                    let n = self.u2()?;
                    for _ in 0..n {
                        let idx = self.u2()?;
                        if let Some(exc) = self.class_name(idx)? {
                            exceptions.push(exc);
                        }
                    }
                }
                "Code" => {
                    let max_stack = self.u2()?;
                    let max_locals = self.u2()?;
                    let code_len = self.u4()? as usize;
                    let bytes = self
                        .data
                        .get(self.pos..self.pos + code_len)
                        .ok_or_else(|| self.bad("truncated code"))?
                        .to_vec();
                    self.pos += code_len;
                    let handler_count = self.u2()?;
                    let mut exception_table = Vec::with_capacity(handler_count as usize);
                    for _ in 0..handler_count {
                        let start = self.u2()?;
                        let end_pc = self.u2()?;
                        let handler = self.u2()?;
                        let catch_type = self.u2()?;
                        exception_table.push((start, end_pc, handler, catch_type));
                    }
                    code = Some(ParsedCode { max_stack, max_locals, code: bytes, exception_table });
                    // sub-attributes are skipped with the rest
                }
                _ => {}
            }
            if end < self.pos || end > self.data.len() {
                return Err(self.bad("attribute length out of bounds"));
            }
            self.pos = end;
        }
        Ok((signature, exceptions, code))
    }

    pub fn read(mut self) -> Result<ParsedClass> {
        let magic = self.u4()?;
        if magic != 0xCAFE_BABE {
            return Err(Error::invariant(
                "class reader",
                format!("bad class file magic {:#010x}", magic),
            ));
        }
        let minor = self.u2()?;
        let major = self.u2()?;
        self.read_pool()?;
        let access_flags = self.u2()?;
        let this_idx = self.u2()?;
        let super_idx = self.u2()?;
        let name = self
            .class_name(this_idx)?
            .ok_or_else(|| Error::invariant("class reader", "this_class index is zero"))?;
        let super_class = self.class_name(super_idx)?;

        let iface_count = self.u2()?;
        let mut interfaces = Vec::with_capacity(iface_count as usize);
        for _ in 0..iface_count {
            let idx = self.u2()?;
            if let Some(iface) = self.class_name(idx)? {
                interfaces.push(iface);
            }
        }

        let field_count = self.u2()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access_flags = self.u2()?;
            let name_idx = self.u2()?;
            let desc_idx = self.u2()?;
            let name = self.utf8(name_idx)?;
            let descriptor = self.utf8(desc_idx)?;
            let (signature, _, _) = self.read_attributes()?;
            fields.push(ParsedField { access_flags, name, descriptor, signature });
        }

        let method_count = self.u2()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access_flags = self.u2()?;
            let name_idx = self.u2()?;
            let desc_idx = self.u2()?;
            let name = self.utf8(name_idx)?;
            let descriptor = self.utf8(desc_idx)?;
            let (signature, exceptions, code) = self.read_attributes()?;
            methods.push(ParsedMethod {
                access_flags,
                name,
                descriptor,
                signature,
                exceptions,
                code,
            });
        }

        Ok(ParsedClass {
            version: (major, minor),
            access_flags,
            name,
            super_class,
            interfaces,
            fields,
            methods,
        })
    }

}

/// Parse a class file from raw bytes.
pub fn parse_class(data: &[u8]) -> Result<ParsedClass> {
    ClassReader::new(data).read()
}
