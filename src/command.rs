//! Outgoing commands.
//!
//! A [`Command`] is a command name plus its already-marshaled arguments.
//! Anything that can be sent as an argument implements [`ToArg`].

use crate::protocol::encode_command;
use bytes::{Bytes, BytesMut};
use std::fmt;

/// Converts a value into one RESP bulk-string argument.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

macro_rules! impl_to_arg_for_int {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

impl_to_arg_for_int!(i32, i64, u32, u64, usize);

/// A command ready to be sent: name followed by arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, value: impl ToArg) -> Self {
        self.args.push(value.to_arg());
        self
    }

    /// Appends every element of `values`.
    pub fn args<A: ToArg>(mut self, values: impl IntoIterator<Item = A>) -> Self {
        self.args.extend(values.into_iter().map(|v| v.to_arg()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arguments(&self) -> &[Bytes] {
        &self.args
    }

    /// Name and arguments as one slice of wire arguments.
    pub fn to_parts(&self) -> Vec<Bytes> {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(Bytes::from_static(self.name.as_bytes()));
        parts.extend(self.args.iter().cloned());
        parts
    }

    /// Appends the wire encoding of this command to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        encode_command(&self.to_parts(), buf);
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            match std::str::from_utf8(arg) {
                Ok(s) if s.len() <= 64 => write!(f, " {}", s)?,
                _ => write!(f, " <{} bytes>", arg.len())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_scan_command() {
        let cmd = Command::new("SCAN")
            .arg(17u64)
            .arg("MATCH")
            .arg("user:*")
            .arg("COUNT")
            .arg(100usize);
        assert_eq!(cmd.name(), "SCAN");
        assert_eq!(
            cmd.arguments(),
            &[
                Bytes::from("17"),
                Bytes::from("MATCH"),
                Bytes::from("user:*"),
                Bytes::from("COUNT"),
                Bytes::from("100"),
            ]
        );
    }

    #[test]
    fn test_encode_into() {
        let mut buf = BytesMut::new();
        Command::new("GETRANGE")
            .arg("k")
            .arg(0i64)
            .arg(-1i64)
            .encode_into(&mut buf);
        assert_eq!(
            &buf[..],
            b"*4\r\n$8\r\nGETRANGE\r\n$1\r\nk\r\n$1\r\n0\r\n$2\r\n-1\r\n"
        );
    }

    #[test]
    fn test_args_from_iterator() {
        let cmd = Command::new("DEL").args(["a", "b"]);
        assert_eq!(cmd.arguments().len(), 2);
    }

    #[test]
    fn test_display_hides_binary() {
        let cmd = Command::new("SET").arg("k").arg(vec![0xffu8, 0x00]);
        assert_eq!(cmd.to_string(), "SET k <2 bytes>");
    }
}
