//! File-driven GPIO backends (§6): input stimulus CSV, output log CSV,
//! and the conf-file syntax for declaring output→input shorts.

use sim_engine::{FatalError, SimTime};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusEvent {
    pub time: SimTime,
    pub port: u32,
    pub pin: u32,
    pub level: bool,
}

/// Parses a `time,port,pin,level` CSV (comments starting with `#`
/// ignored); `time` must be monotonically non-decreasing (§6).
pub fn parse_stimulus(contents: &str) -> Result<Vec<StimulusEvent>, FatalError> {
    let mut events = Vec::new();
    let mut last_time = 0u64;
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(FatalError::new(
                "gpio_stimulus",
                None,
                format!("line {}: expected 4 fields, got {}", lineno + 1, fields.len()),
            ));
        }
        let parse = |s: &str, what: &str| -> Result<u64, FatalError> {
            s.trim().parse().map_err(|_| {
                FatalError::new("gpio_stimulus", None, format!("line {}: bad {what} {s:?}", lineno + 1))
            })
        };
        let time = parse(fields[0], "time")?;
        if time < last_time {
            return Err(FatalError::new(
                "gpio_stimulus",
                None,
                format!("line {}: time {time} out of order (last {last_time})", lineno + 1),
            ));
        }
        last_time = time;
        let port = parse(fields[1], "port")? as u32;
        let pin = parse(fields[2], "pin")? as u32;
        let level = parse(fields[3], "level")? != 0;
        events.push(StimulusEvent { time, port, pin, level });
    }
    Ok(events)
}

/// Parses `short X.x Y.y` / `s X.x Y.y` lines, capping source pins at
/// `MAX_SHORTS_PER_PIN` destinations (§6).
pub fn parse_conf(contents: &str, max_per_pin: usize) -> Result<Vec<(u32, u32, u32, u32)>, FatalError> {
    let mut shorts = Vec::new();
    let mut counts: std::collections::HashMap<(u32, u32), usize> = std::collections::HashMap::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut it = line.split_whitespace();
        let kw = it.next().unwrap_or("");
        if kw != "short" && kw != "s" {
            return Err(FatalError::new("gpio_conf", None, format!("line {}: unknown keyword {kw:?}", lineno + 1)));
        }
        let src = it.next().ok_or_else(|| malformed(lineno))?;
        let dst = it.next().ok_or_else(|| malformed(lineno))?;
        let (sp, sx) = parse_port_pin(src, lineno)?;
        let (dp, dx) = parse_port_pin(dst, lineno)?;
        let count = counts.entry((sp, sx)).or_insert(0);
        *count += 1;
        if *count > max_per_pin {
            return Err(FatalError::new(
                "gpio_conf",
                None,
                format!("line {}: pin {sp}.{sx} exceeds {max_per_pin} shorts", lineno + 1),
            ));
        }
        shorts.push((sp, sx, dp, dx));
    }
    Ok(shorts)
}

fn malformed(lineno: usize) -> FatalError {
    FatalError::new("gpio_conf", None, format!("line {}: expected 'short X.x Y.y'", lineno + 1))
}

fn parse_port_pin(s: &str, lineno: usize) -> Result<(u32, u32), FatalError> {
    let (port, pin) = s.split_once('.').ok_or_else(|| malformed(lineno))?;
    let port = port.parse().map_err(|_| malformed(lineno))?;
    let pin = pin.parse().map_err(|_| malformed(lineno))?;
    Ok((port, pin))
}

pub struct OutputLogger<W> {
    out: W,
}

impl<W: Write> OutputLogger<W> {
    pub fn new(out: W) -> Self {
        OutputLogger { out }
    }

    pub fn log(&mut self, time: SimTime, port: u32, pin: u32, level: bool) -> Result<(), FatalError> {
        writeln!(self.out, "{time},{port},{pin},{}", level as u8).map_err(FatalError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stimulus_parses_and_ignores_comments() {
        let csv = "# header\n0,0,3,1\n100,0,3,0\n";
        let events = parse_stimulus(csv).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StimulusEvent { time: 0, port: 0, pin: 3, level: true });
    }

    #[test]
    fn stimulus_rejects_out_of_order_time() {
        let csv = "10,0,0,1\n5,0,0,0\n";
        assert!(parse_stimulus(csv).is_err());
    }

    #[test]
    fn conf_parses_short_and_s_keywords() {
        let conf = "short 0.1 0.5\ns 0.1 1.2\n";
        let shorts = parse_conf(conf, 8).unwrap();
        assert_eq!(shorts, vec![(0, 1, 0, 5), (0, 1, 1, 2)]);
    }

    #[test]
    fn conf_rejects_too_many_shorts_per_pin() {
        let mut conf = String::new();
        for i in 0..9 {
            conf.push_str(&format!("short 0.1 0.{i}\n"));
        }
        assert!(parse_conf(&conf, 8).is_err());
    }

    #[test]
    fn output_logger_writes_csv_row() {
        let mut buf = Vec::new();
        {
            let mut logger = OutputLogger::new(&mut buf);
            logger.log(42, 0, 3, true).unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "42,0,3,1\n");
    }
}
