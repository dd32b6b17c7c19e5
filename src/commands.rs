/// Command palette entries and their matching rules

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Lookup,
  Reverse,
  Autocomplete,
  Corporate,
  Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub kind: CommandKind,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "lookup",
    aliases: &["l", "postal", "zip"],
    description: "Postal code → address form",
    kind: CommandKind::Lookup,
  },
  Command {
    name: "reverse",
    aliases: &["r", "rev"],
    description: "Address → postal code",
    kind: CommandKind::Reverse,
  },
  Command {
    name: "autocomplete",
    aliases: &["a", "ac", "complete"],
    description: "Address input with suggestions",
    kind: CommandKind::Autocomplete,
  },
  Command {
    name: "corporate",
    aliases: &["c", "corp", "houjin"],
    description: "Corporate number registry search",
    kind: CommandKind::Corporate,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit kenall",
    kind: CommandKind::Quit,
  },
];

/// Commands matching the input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let aliases = cmd.aliases.iter();
      let rank = if cmd.name == input {
        0
      } else if cmd.aliases.contains(&input.as_str()) {
        1
      } else if cmd.name.starts_with(&input) {
        2
      } else if aliases.clone().any(|a| a.starts_with(&input)) {
        3
      } else if cmd.name.contains(&input) {
        4
      } else if aliases.clone().any(|a| a.contains(&input)) {
        5
      } else {
        return None;
      };
      Some((cmd, rank))
    })
    .collect();

  // Stable sort keeps table order within a rank
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
    assert_eq!(get_suggestions("  ").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_name_first() {
    assert_eq!(get_suggestions("corporate")[0].kind, CommandKind::Corporate);
  }

  #[test]
  fn test_alias_beats_prefix() {
    assert_eq!(get_suggestions("a")[0].kind, CommandKind::Autocomplete);
    // "r" is reverse's alias, even though "corporate" contains an r
    let suggestions = get_suggestions("r");
    assert_eq!(suggestions[0].kind, CommandKind::Reverse);
    assert!(suggestions.iter().any(|c| c.kind == CommandKind::Corporate));
  }

  #[test]
  fn test_prefix_and_contains() {
    assert_eq!(get_suggestions("loo")[0].kind, CommandKind::Lookup);
    assert_eq!(get_suggestions("ver")[0].kind, CommandKind::Reverse);
    assert!(get_suggestions("xyz").is_empty());
  }
}
