//! MI value grammar
//!
//! ```text
//! value  = const | tuple | list
//! const  = c-string
//! tuple  = "{}" | "{" result ( "," result )* "}"
//! list   = "[]" | "[" value ( "," value )* "]" | "[" result ( "," result )* "]"
//! result = variable "=" value
//! ```

use serde_json::{Map, Value};

/// Byte cursor over a single MI line
pub(crate) struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, expected: u8) -> Option<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Parse a double-quoted C string, resolving its escapes
    pub(crate) fn c_string(&mut self) -> Option<String> {
        self.eat(b'"')?;
        let mut out: Vec<u8> = Vec::new();

        loop {
            match self.bump()? {
                b'"' => break,
                b'\\' => {
                    let esc = self.bump()?;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'a' => out.push(0x07),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'v' => out.push(0x0b),
                        b'e' => out.push(0x1b),
                        b'0'..=b'7' => {
                            let mut code = u32::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        code = code * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((code & 0xff) as u8);
                        }
                        other => out.push(other),
                    }
                }
                b => out.push(b),
            }
        }

        Some(String::from_utf8_lossy(&out).into_owned())
    }

    fn variable(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'=' {
                break;
            }
            if matches!(b, b',' | b'{' | b'}' | b'[' | b']' | b'"') {
                return None;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            b'"' => self.c_string().map(Value::String),
            b'{' => self.tuple(),
            b'[' => self.list(),
            _ => None,
        }
    }

    fn result(&mut self) -> Option<(String, Value)> {
        let key = self.variable()?;
        self.eat(b'=')?;
        let value = self.value()?;
        Some((key, value))
    }

    fn tuple(&mut self) -> Option<Value> {
        self.eat(b'{')?;
        let mut pairs = Vec::new();
        if self.eat(b'}').is_some() {
            return Some(Value::Object(Map::new()));
        }
        loop {
            pairs.push(self.result()?);
            match self.bump()? {
                b',' => continue,
                b'}' => break,
                _ => return None,
            }
        }
        Some(Value::Object(fold_results(pairs)))
    }

    fn list(&mut self) -> Option<Value> {
        self.eat(b'[')?;
        let mut items = Vec::new();
        if self.eat(b']').is_some() {
            return Some(Value::Array(items));
        }
        let holds_values = matches!(self.peek()?, b'"' | b'{' | b'[');
        loop {
            if holds_values {
                items.push(self.value()?);
            } else {
                let (key, value) = self.result()?;
                let mut entry = Map::new();
                entry.insert(key, value);
                items.push(Value::Object(entry));
            }
            match self.bump()? {
                b',' => continue,
                b']' => break,
                _ => return None,
            }
        }
        Some(Value::Array(items))
    }

    /// Parse the `,result,result...` tail of an out-of-band or result record
    pub(crate) fn results(&mut self) -> Option<Map<String, Value>> {
        let mut pairs = Vec::new();
        while self.eat(b',').is_some() {
            pairs.push(self.result()?);
        }
        if self.is_done() { Some(fold_results(pairs)) } else { None }
    }

    /// Read the record class (`done`, `stopped`, ...) up to the first comma
    pub(crate) fn class(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }
}

/// Repeated keys in one tuple collect into an array, in arrival order
fn fold_results(pairs: Vec<(String, Value)>) -> Map<String, Value> {
    let mut repeated: Vec<String> = Vec::new();
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            None => {
                map.insert(key, value);
            }
            Some(Value::Array(items)) if repeated.contains(&key) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
                repeated.push(key);
            }
        }
    }
    map
}
