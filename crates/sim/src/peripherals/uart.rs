// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde_json::json;
use std::fmt;
use std::io::{self, Write};

/// Serial console. Everything written is kept; optionally echoed to stdout.
#[derive(Debug, Default)]
pub struct Uart {
    output: String,
    echo: bool,
}

impl Uart {
    pub fn new(echo: bool) -> Self {
        Self {
            output: String::new(),
            echo,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        if self.echo {
            let mut stdout = io::stdout().lock();
            stdout.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
            stdout.flush().map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

impl crate::Peripheral for Uart {
    fn name(&self) -> &'static str {
        "uart"
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "bytes_written": self.output.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn test_captures_output() {
        let mut uart = Uart::new(false);
        write!(uart, "Since reset {} wakeups", 3).unwrap();
        assert_eq!(uart.output(), "Since reset 3 wakeups");
        assert_eq!(uart.take_output(), "Since reset 3 wakeups");
        assert!(uart.output().is_empty());
    }
}
