/// one line typed at the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    // port name, or None to pick from a list
    Serial(Option<String>),
    On,
    Off,
    Toggle,
    Get,
    Status,
    Disconnect,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  connect        connect to the cloud backend
  serial [PORT]  connect to the board over serial, lists ports when PORT is omitted
  on | off       switch the LED, waits for the device to confirm
  toggle         manual control, flip the value through /change-value
  get            read the current value from the backend
  status         show the session
  disconnect     close the serial port
  help           this text
  quit           leave";

/// Ok(None) for a blank line
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next().map(|s| s.to_string());
    if words.next().is_some() {
        return Err(format!("too many arguments for '{}'", head));
    }

    let cmd = match (head.to_ascii_lowercase().as_str(), arg) {
        ("connect", None) => Command::Connect,
        ("serial", port) => Command::Serial(port),
        ("on", None) => Command::On,
        ("off", None) => Command::Off,
        ("toggle", None) => Command::Toggle,
        ("get", None) => Command::Get,
        ("status", None) => Command::Status,
        ("disconnect", None) => Command::Disconnect,
        ("help", None) | ("?", None) => Command::Help,
        ("quit", None) | ("exit", None) => Command::Quit,
        (other, Some(_)) if is_known(other) => return Err(format!("'{}' takes no argument", other)),
        (other, _) => return Err(format!("unknown command '{}', type 'help'", other)),
    };
    Ok(Some(cmd))
}

fn is_known(word: &str) -> bool {
    matches!(
        word,
        "connect" | "on" | "off" | "toggle" | "get" | "status" | "disconnect" | "help" | "?" | "quit" | "exit"
    )
}

/// answer to the port prompt: a list index, a port name, or nothing
pub fn parse_port_choice(answer: &str, ports: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    match answer.parse::<usize>() {
        Ok(n) if n >= 1 && n <= ports.len() => Some(ports[n - 1].clone()),
        _ => Some(answer.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("connect").unwrap(), Some(Command::Connect));
        assert_eq!(parse("  ON ").unwrap(), Some(Command::On));
        assert_eq!(parse("serial").unwrap(), Some(Command::Serial(None)));
        assert_eq!(
            parse("serial /dev/ttyUSB0").unwrap(),
            Some(Command::Serial(Some("/dev/ttyUSB0".to_string())))
        );
        assert_eq!(parse("exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("blink").unwrap_err().contains("unknown command"));
        assert!(parse("on now").unwrap_err().contains("takes no argument"));
        assert!(parse("serial a b").unwrap_err().contains("too many"));
    }

    #[test]
    fn test_port_choice() {
        let ports = vec!["/dev/ttyUSB0".to_string(), "/dev/ttyACM0".to_string()];
        assert_eq!(parse_port_choice("2", &ports).as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(parse_port_choice("COM3", &ports).as_deref(), Some("COM3"));
        assert_eq!(parse_port_choice("  ", &ports), None);
    }
}
