use arm_motion_lib::Position;
use eyre::{bail, Result, WrapErr};

/// Operator command read from a script line.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Target(Position),
    Auto,
    Grip,
    Record,
    Replay,
    Abort,
    Clear,
    Reset,
    Wait(u64),
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<OperatorCommand>> {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = parts.collect();

    let command = match keyword.as_str() {
        "target" | "t" => {
            if args.len() != 3 {
                bail!("target expects 3 coordinates, got {}", args.len());
            }
            let mut coords = [0.0; 3];
            for (slot, arg) in coords.iter_mut().zip(&args) {
                *slot = arg
                    .parse::<f64>()
                    .wrap_err_with(|| format!("invalid coordinate '{}'", arg))?;
            }
            OperatorCommand::Target(Position::from(coords))
        }
        "auto" | "a" => OperatorCommand::Auto,
        "grip" | "g" => OperatorCommand::Grip,
        "record" | "r" => OperatorCommand::Record,
        "replay" | "p" => OperatorCommand::Replay,
        "abort" | "x" => OperatorCommand::Abort,
        "clear" => OperatorCommand::Clear,
        "reset" | "home" => OperatorCommand::Reset,
        "wait" | "w" => {
            let ticks = match args.first() {
                Some(n) => n
                    .parse::<u64>()
                    .wrap_err_with(|| format!("invalid tick count '{}'", n))?,
                None => 1,
            };
            OperatorCommand::Wait(ticks)
        }
        other => bail!("unknown command '{}'", other),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_command("target 1 2.5 -3").unwrap(),
            Some(OperatorCommand::Target(Position::new(1.0, 2.5, -3.0)))
        );
    }

    #[test]
    fn test_parse_keywords_and_aliases() {
        assert_eq!(parse_command("AUTO").unwrap(), Some(OperatorCommand::Auto));
        assert_eq!(parse_command("g").unwrap(), Some(OperatorCommand::Grip));
        assert_eq!(parse_command("  replay  ").unwrap(), Some(OperatorCommand::Replay));
        assert_eq!(parse_command("wait").unwrap(), Some(OperatorCommand::Wait(1)));
        assert_eq!(parse_command("wait 30").unwrap(), Some(OperatorCommand::Wait(30)));
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   # comment").unwrap(), None);
        assert_eq!(parse_command("grip # close").unwrap(), Some(OperatorCommand::Grip));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(parse_command("target 1 2").is_err());
        assert!(parse_command("target 1 two 3").is_err());
        assert!(parse_command("wait -4").is_err());
        assert!(parse_command("dance").is_err());
    }
}
