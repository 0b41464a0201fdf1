/// Shell commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available shell commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home"],
    description: "Counts and recent orders",
  },
  Command {
    name: "products",
    aliases: &["p", "product"],
    description: "List, view and edit products",
  },
  Command {
    name: "categories",
    aliases: &["c", "cats", "category"],
    description: "List and edit categories",
  },
  Command {
    name: "orders",
    aliases: &["o", "order"],
    description: "Browse orders and change their status",
  },
  Command {
    name: "login",
    aliases: &["signin"],
    description: "Log in as administrator",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Forget the stored credential",
  },
  Command {
    name: "whoami",
    aliases: &["status"],
    description: "Show whether a credential is stored",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    description: "List commands",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Leave the shell",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve the first word of a shell line to a command, taking the best suggestion.
pub fn resolve(word: &str) -> Option<&'static Command> {
  get_suggestions(word.trim()).into_iter().next()
}

/// Split a shell line into arguments. Single or double quotes group words.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
  let mut args = Vec::new();
  let mut current = String::new();
  let mut in_word = false;
  let mut quote: Option<char> = None;

  for c in line.chars() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => current.push(c),
      None if c == '"' || c == '\'' => {
        quote = Some(c);
        in_word = true;
      }
      None if c.is_whitespace() => {
        if in_word {
          args.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      None => {
        current.push(c);
        in_word = true;
      }
    }
  }

  if let Some(q) = quote {
    return Err(format!("unterminated {} quote", q));
  }
  if in_word {
    args.push(current);
  }
  Ok(args)
}
