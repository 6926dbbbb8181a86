//! Component E: per-user state and the textual rule DSL that mutates it.

use crate::{
    authz::{Category, CommandCatalog},
    error::{AclError, AclResult},
    pattern::MAX_PATTERN_LEN,
};
use bytes::Bytes;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// `User::allowed_commands` is a fixed-size bit vector sized to
/// `command_id::MAX_COMMAND_ID` bits (128 bytes for 1024 commands).
const BITMAP_WORDS: usize = crate::command_id::MAX_COMMAND_ID as usize / 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBitmap {
    words: [u64; BITMAP_WORDS],
}

impl CommandBitmap {
    pub const fn empty() -> Self {
        Self {
            words: [0; BITMAP_WORDS],
        }
    }

    pub const fn all() -> Self {
        Self {
            words: [u64::MAX; BITMAP_WORDS],
        }
    }

    pub fn set(&mut self, id: u32) {
        if let Some((w, b)) = Self::locate(id) {
            self.words[w] |= 1 << b;
        }
    }

    pub fn clear(&mut self, id: u32) {
        if let Some((w, b)) = Self::locate(id) {
            self.words[w] &= !(1 << b);
        }
    }

    pub fn get(&self, id: u32) -> bool {
        match Self::locate(id) {
            Some((w, b)) => self.words[w] & (1 << b) != 0,
            None => false,
        }
    }

    pub fn set_all(&mut self) {
        self.words = [u64::MAX; BITMAP_WORDS];
    }

    pub fn clear_all(&mut self) {
        self.words = [0; BITMAP_WORDS];
    }

    fn locate(id: u32) -> Option<(usize, u32)> {
        let id = id as usize;
        if id >= crate::command_id::MAX_COMMAND_ID as usize {
            None
        } else {
            Some((id / 64, (id % 64) as u32))
        }
    }
}

/// Per-user boolean capabilities (§3). Backed by a plain bitset rather than
/// four `bool` fields so the invariants in §3 read as bit twiddling, the way
/// the rest of the command-flag machinery in this codebase works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    pub const ENABLED: Flags = Flags(1 << 0);
    pub const ALLKEYS: Flags = Flags(1 << 1);
    pub const ALLCOMMANDS: Flags = Flags(1 << 2);
    pub const NOPASS: Flags = Flags(1 << 3);

    pub const fn empty() -> Self {
        Flags(0)
    }

    pub fn contains(self, flag: Flags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: Flags) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Flags) {
        self.0 &= !flag.0;
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Flags {
    type Output = Flags;
    fn bitand(self, rhs: Flags) -> Flags {
        Flags(self.0 & rhs.0)
    }
}

impl Not for Flags {
    type Output = Flags;
    fn not(self) -> Flags {
        Flags(!self.0)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: Bytes,
    pub flags: Flags,
    pub passwords: Vec<Bytes>,
    pub patterns: Vec<Bytes>,
    pub allowed_commands: CommandBitmap,
    pub allowed_subcommands: Vec<(u32, Vec<Bytes>)>,
}

impl User {
    /// A freshly `create`d user: every flag clear, every set empty (§4.E
    /// state machine's initial state).
    pub fn new(name: Bytes) -> Self {
        Self {
            name,
            flags: Flags::empty(),
            passwords: Vec::new(),
            patterns: Vec::new(),
            allowed_commands: CommandBitmap::empty(),
            allowed_subcommands: Vec::new(),
        }
    }

    /// The built-in `default` user: `{ENABLED, ALLKEYS, ALLCOMMANDS, NOPASS}`.
    pub fn new_default(name: Bytes) -> Self {
        let mut u = Self::new(name);
        u.flags = Flags::ENABLED | Flags::ALLKEYS | Flags::ALLCOMMANDS | Flags::NOPASS;
        u.allowed_commands.set_all();
        u
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(Flags::ENABLED)
    }

    fn subcommands_mut(&mut self, id: u32) -> &mut Vec<Bytes> {
        if let Some(idx) = self.allowed_subcommands.iter().position(|(i, _)| *i == id) {
            &mut self.allowed_subcommands[idx].1
        } else {
            self.allowed_subcommands.push((id, Vec::new()));
            &mut self.allowed_subcommands.last_mut().unwrap().1
        }
    }

    fn clear_subcommands(&mut self, id: u32) {
        self.allowed_subcommands.retain(|(i, _)| *i != id);
    }

    pub fn subcommands_for(&self, id: u32) -> Option<&[Bytes]> {
        self.allowed_subcommands
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, subs)| subs.as_slice())
    }

    /// Parses and applies a single rule from §4.E against this user.
    /// On `SyntaxError` the user is left exactly as it was before the call —
    /// earlier rules in a multi-rule batch are *not* rolled back, only this
    /// one never takes effect (documented caller responsibility, §4.E/§9).
    pub fn apply_rule(&mut self, rule: &[u8], catalog: &dyn CommandCatalog) -> AclResult<()> {
        let rule = Rule::parse(rule, catalog)?;
        self.apply(&rule, catalog)
    }

    pub fn apply(&mut self, rule: &Rule, catalog: &dyn CommandCatalog) -> AclResult<()> {
        match rule {
            Rule::On => self.flags.insert(Flags::ENABLED),
            Rule::Off => self.flags.remove(Flags::ENABLED),

            Rule::AllKeys => {
                self.flags.insert(Flags::ALLKEYS);
                self.patterns.clear();
            }
            Rule::ResetKeys => {
                self.flags.remove(Flags::ALLKEYS);
                self.patterns.clear();
            }
            Rule::AddPattern(pat) => {
                self.flags.remove(Flags::ALLKEYS);
                if !self.patterns.contains(pat) {
                    self.patterns.push(pat.clone());
                }
            }

            Rule::AllCommands => {
                self.flags.insert(Flags::ALLCOMMANDS);
                self.allowed_commands.set_all();
                self.allowed_subcommands.clear();
            }
            Rule::AddCommand(id) => {
                self.allowed_commands.set(*id);
                self.clear_subcommands(*id);
            }
            Rule::AddSubcommand(id, sub) => {
                if !self.allowed_commands.get(*id) {
                    let subs = self.subcommands_mut(*id);
                    if !subs.contains(sub) {
                        subs.push(sub.clone());
                    }
                }
            }
            Rule::RemoveCommand(id) => {
                self.allowed_commands.clear(*id);
                self.flags.remove(Flags::ALLCOMMANDS);
                self.clear_subcommands(*id);
            }
            Rule::AddCategory(cat) => {
                for id in catalog.command_ids_in_category(*cat) {
                    self.allowed_commands.set(id);
                    self.clear_subcommands(id);
                }
                if *cat == Category::All {
                    self.flags.insert(Flags::ALLCOMMANDS);
                }
            }
            Rule::RemoveCategory(cat) => {
                for id in catalog.command_ids_in_category(*cat) {
                    self.allowed_commands.clear(id);
                    self.clear_subcommands(id);
                }
                self.flags.remove(Flags::ALLCOMMANDS);
            }

            Rule::NoPass => {
                self.flags.insert(Flags::NOPASS);
                self.passwords.clear();
            }
            Rule::AddPassword(pwd) => {
                self.flags.remove(Flags::NOPASS);
                if !self.passwords.contains(pwd) {
                    self.passwords.push(pwd.clone());
                }
            }
            Rule::RemovePassword(pwd) => {
                self.passwords.retain(|p| p != pwd);
            }
            Rule::ResetPass => {
                self.flags.remove(Flags::NOPASS);
                self.passwords.clear();
            }

            Rule::Reset => {
                self.flags.remove(Flags::NOPASS);
                self.passwords.clear();
                self.flags.remove(Flags::ALLKEYS);
                self.patterns.clear();
                self.flags.remove(Flags::ENABLED);
                self.flags.remove(Flags::ALLCOMMANDS);
                self.allowed_commands.clear_all();
                self.allowed_subcommands.clear();
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    On,
    Off,
    AllKeys,
    ResetKeys,
    AddPattern(Bytes),
    AllCommands,
    AddCommand(u32),
    AddSubcommand(u32, Bytes),
    RemoveCommand(u32),
    AddCategory(Category),
    RemoveCategory(Category),
    NoPass,
    AddPassword(Bytes),
    RemovePassword(Bytes),
    ResetPass,
    Reset,
}

impl Rule {
    /// Parses one rule token. `rule` is taken verbatim after the sigil and
    /// may be binary; only the keyword/sigil itself is matched
    /// case-insensitively.
    pub fn parse(rule: &[u8], catalog: &dyn CommandCatalog) -> AclResult<Rule> {
        let err = || AclError::SyntaxError {
            rule: Bytes::copy_from_slice(rule),
        };

        if rule.eq_ignore_ascii_case(b"on") {
            return Ok(Rule::On);
        }
        if rule.eq_ignore_ascii_case(b"off") {
            return Ok(Rule::Off);
        }
        if rule.eq_ignore_ascii_case(b"allkeys") || rule == b"~*" {
            return Ok(Rule::AllKeys);
        }
        if rule.eq_ignore_ascii_case(b"resetkeys") {
            return Ok(Rule::ResetKeys);
        }
        if rule.eq_ignore_ascii_case(b"allcommands") || rule == b"+@all" {
            return Ok(Rule::AllCommands);
        }
        if rule.eq_ignore_ascii_case(b"nopass") {
            return Ok(Rule::NoPass);
        }
        if rule.eq_ignore_ascii_case(b"resetpass") {
            return Ok(Rule::ResetPass);
        }
        if rule.eq_ignore_ascii_case(b"reset") {
            return Ok(Rule::Reset);
        }

        match rule.first() {
            Some(b'~') => {
                let pat = &rule[1..];
                if pat.is_empty() || pat.len() > MAX_PATTERN_LEN {
                    return Err(err());
                }
                Ok(Rule::AddPattern(Bytes::copy_from_slice(pat)))
            }
            Some(b'>') => Ok(Rule::AddPassword(Bytes::copy_from_slice(&rule[1..]))),
            Some(b'<') => Ok(Rule::RemovePassword(Bytes::copy_from_slice(&rule[1..]))),
            Some(b'+') => parse_cmd_rule(&rule[1..], catalog, true, err),
            Some(b'-') => parse_cmd_rule(&rule[1..], catalog, false, err),
            _ => Err(err()),
        }
    }
}

fn parse_cmd_rule(
    body: &[u8],
    catalog: &dyn CommandCatalog,
    allow: bool,
    err: impl Fn() -> AclError,
) -> AclResult<Rule> {
    if body.is_empty() {
        return Err(err());
    }

    if body[0] == b'@' {
        let cat = Category::parse(&body[1..]).ok_or_else(err)?;
        return Ok(if allow {
            Rule::AddCategory(cat)
        } else {
            Rule::RemoveCategory(cat)
        });
    }

    if let Some(bar) = body.iter().position(|&b| b == b'|') {
        if !allow {
            // "-cmd|sub" has no meaning: a command can only be denied
            // wholesale, never one subcommand at a time (§4.E).
            return Err(err());
        }
        let (name, sub) = (&body[..bar], &body[bar + 1..]);
        if name.is_empty() || sub.is_empty() {
            return Err(err());
        }
        let id = catalog.id_of(name);
        return Ok(Rule::AddSubcommand(id, Bytes::copy_from_slice(sub)));
    }

    let id = catalog.id_of(body);
    Ok(if allow {
        Rule::AddCommand(id)
    } else {
        Rule::RemoveCommand(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::tests::TestCatalog;

    #[test]
    fn invariant_nopass_implies_empty_passwords() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b">pwd", &catalog).unwrap();
        assert_eq!(u.passwords, vec![Bytes::from_static(b"pwd")]);

        u.apply_rule(b"nopass", &catalog).unwrap();
        assert!(u.flags.contains(Flags::NOPASS));
        assert!(u.passwords.is_empty());
    }

    #[test]
    fn invariant_allkeys_implies_empty_patterns() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b"~foo:*", &catalog).unwrap();
        assert_eq!(u.patterns.len(), 1);

        u.apply_rule(b"allkeys", &catalog).unwrap();
        assert!(u.flags.contains(Flags::ALLKEYS));
        assert!(u.patterns.is_empty());
    }

    #[test]
    fn invariant_allcommands_sets_every_bit() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b"allcommands", &catalog).unwrap();
        assert!(u.flags.contains(Flags::ALLCOMMANDS));
        for id in 0..crate::command_id::MAX_COMMAND_ID {
            assert!(u.allowed_commands.get(id));
        }
        assert!(u.allowed_subcommands.is_empty());
    }

    #[test]
    fn rule_idempotence_add_command() {
        let catalog = TestCatalog::new();
        let mut once = User::new("u".into());
        once.apply_rule(b"+get", &catalog).unwrap();

        let mut twice = User::new("u".into());
        twice.apply_rule(b"+get", &catalog).unwrap();
        twice.apply_rule(b"+get", &catalog).unwrap();

        assert_eq!(once.allowed_commands, twice.allowed_commands);
    }

    #[test]
    fn rule_idempotence_add_pattern() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b"~foo:*", &catalog).unwrap();
        u.apply_rule(b"~foo:*", &catalog).unwrap();
        assert_eq!(u.patterns.len(), 1);
    }

    #[test]
    fn rule_idempotence_add_password() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b">pw", &catalog).unwrap();
        u.apply_rule(b">pw", &catalog).unwrap();
        assert_eq!(u.passwords.len(), 1);
    }

    #[test]
    fn reset_equals_fresh_user() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b"on", &catalog).unwrap();
        u.apply_rule(b">pw", &catalog).unwrap();
        u.apply_rule(b"~foo:*", &catalog).unwrap();
        u.apply_rule(b"+get", &catalog).unwrap();

        u.apply_rule(b"reset", &catalog).unwrap();

        let fresh = User::new("u".into());
        assert_eq!(u.flags, fresh.flags);
        assert_eq!(u.passwords, fresh.passwords);
        assert_eq!(u.patterns, fresh.patterns);
        assert_eq!(u.allowed_commands, fresh.allowed_commands);
        assert!(u.allowed_subcommands.is_empty());
    }

    #[test]
    fn unknown_rule_is_syntax_error() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        let e = u.apply_rule(b"bogus", &catalog).unwrap_err();
        assert!(matches!(e, AclError::SyntaxError { .. }));
    }

    #[test]
    fn partial_application_is_not_rolled_back() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        u.apply_rule(b"on", &catalog).unwrap();
        assert!(u.apply_rule(b"bogus", &catalog).is_err());
        assert!(u.is_enabled());
    }

    #[test]
    fn subcommand_rule_rejects_deny_form() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        let e = u.apply_rule(b"-debug|sleep", &catalog).unwrap_err();
        assert!(matches!(e, AclError::SyntaxError { .. }));
    }

    #[test]
    fn oversized_pattern_is_rejected() {
        let catalog = TestCatalog::new();
        let mut u = User::new("u".into());
        let huge = vec![b'a'; MAX_PATTERN_LEN + 1];
        let mut rule = vec![b'~'];
        rule.extend_from_slice(&huge);
        let e = u.apply_rule(&rule, &catalog).unwrap_err();
        assert!(matches!(e, AclError::SyntaxError { .. }));
    }
}
