//! Parser for the `-x` exit condition mini-language
//!
//! ```text
//! spec      := count loc? ':' opts?
//! count     := '-'? digit+          '-' counts failed rounds instead of successful ones
//! loc       := 's'                  the count must be reached in one unbroken run
//! opts      := opt+
//! opt       := modifier? letter arglist?
//! modifier  := '+' | '-'            only before 'n'
//! letter    := 'x' | 'n' | 'N' | 'm' | 'c' | 'q'
//! arglist   := '(' argbody ')'      only after 'm'
//! argbody   := digit* (':' char char)?
//! ```
//!
//! Option letters:
//!
//! - `x` exit status reflects the condition instead of probe success
//! - `n` report one count (`+n` successes, `-n` failures, bare `n` the counted kind)
//! - `N` report both counts
//! - `m` keep a ping map; `m(size)`, `m(:SF)` or `m(size:SF)` set its size and
//!   the success/failure glyphs
//! - `c` report the condition state as `T`/`F`
//! - `q` omit the report label
//!
//! # Example
//! ```
//! use pingexit::grammar::parse;
//!
//! let condition = parse("-3s:xNm(20)").unwrap();
//! assert_eq!(condition.expect(), 3);
//! assert!(condition.counts_failures());
//! assert!(condition.requires_sequence());
//! assert_eq!(condition.max_map_size(), Some(20));
//! ```

use crate::condition::{Condition, ReportFlags};
use crate::config::MapConfig;
use crate::error::{ConditionError, Result};
use crate::ping_map::{MapGlyphs, PingMap};
use tracing::debug;

/// All option letters accepted after the ':'
pub const OPTION_LETTERS: &str = "xnNmcq";

/// Parse a specification with the default map configuration
pub fn parse(spec: &str) -> Result<Condition> {
    parse_with(spec, &MapConfig::default())
}

/// Parse a specification, sizing the ping map from `config`
///
/// An invalid `config` is reported as a configuration error for `spec`.
pub fn parse_with(spec: &str, config: &MapConfig) -> Result<Condition> {
    config
        .validate()
        .map_err(|e| ConditionError::Configuration {
            spec: spec.to_string(),
            message: e.to_string(),
        })?;

    let mut parser = Parser::new(spec, config);
    parser.parse_spec()?;
    let condition = parser.finish()?;
    debug!(spec, parsed = %condition, "parsed exit condition");
    Ok(condition)
}

/// Everything collected while walking the string, before validation
#[derive(Debug, Default)]
struct Draft {
    expect: u64,
    count_failures: bool,
    require_sequence: bool,
    exit_on_condition: bool,
    report: ReportFlags,
    glyphs: MapGlyphs,
    max_map_size: Option<usize>,
}

struct Parser<'a> {
    spec: &'a str,
    chars: Vec<char>,
    pos: usize,
    config: &'a MapConfig,
    draft: Draft,
}

impl<'a> Parser<'a> {
    fn new(spec: &'a str, config: &'a MapConfig) -> Self {
        Self {
            spec,
            chars: spec.chars().collect(),
            pos: 0,
            config,
            draft: Draft::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error<T>(&self, position: usize, message: impl Into<String>) -> Result<T> {
        Err(ConditionError::Syntax {
            spec: self.spec.to_string(),
            position,
            message: message.into(),
        })
    }

    fn parse_spec(&mut self) -> Result<()> {
        self.parse_count()?;
        self.parse_location()?;
        self.parse_options()
    }

    /// `'-'? digit+`
    fn parse_count(&mut self) -> Result<()> {
        if self.peek() == Some('-') {
            self.draft.count_failures = true;
            self.pos += 1;
        }

        let start = self.pos;
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            let digit = u64::from(c.to_digit(10).unwrap_or(0));
            self.draft.expect = match self
                .draft
                .expect
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
            {
                Some(v) => v,
                None => return self.error(self.pos, "expected count is too large"),
            };
            self.pos += 1;
        }

        if self.pos == start {
            return match self.peek() {
                None => self.error(self.pos, "empty count, expecting digit"),
                Some(c) if self.pos == 0 => {
                    self.error(self.pos, format!("unexpected character '{c}' at start"))
                }
                Some(c) => self.error(self.pos, format!("empty count, expecting digit, got '{c}'")),
            };
        }
        Ok(())
    }

    /// `'s'? ':'`
    fn parse_location(&mut self) -> Result<()> {
        loop {
            let at = self.pos;
            match self.bump() {
                Some(':') => return Ok(()),
                Some('s') if !self.draft.require_sequence => self.draft.require_sequence = true,
                Some(c) if self.draft.require_sequence => {
                    return self.error(at, format!("repeat loc flag '{c}'"));
                }
                Some(c) => return self.error(at, format!("expect ':', got '{c}'")),
                None => return self.error(at, "unexpected end of specification, expecting ':'"),
            }
        }
    }

    fn parse_options(&mut self) -> Result<()> {
        while self.peek().is_some() {
            self.parse_option()?;
        }
        Ok(())
    }

    /// `modifier? letter arglist?`
    fn parse_option(&mut self) -> Result<()> {
        let modifier = match self.peek() {
            Some(m @ ('+' | '-')) => {
                self.pos += 1;
                Some(m)
            }
            _ => None,
        };

        let letter_pos = self.pos;
        let letter = match self.bump() {
            Some(c) => c,
            None => return self.error(letter_pos, "unexpected end of option string"),
        };
        if !OPTION_LETTERS.contains(letter) {
            return self.error(letter_pos, format!("invalid option '{letter}'"));
        }
        if modifier.is_some() && letter != 'n' {
            return self.error(letter_pos, "+/- modifiers only allowed for 'n' option");
        }

        let args = self.parse_arglist()?;
        if let Some((args_pos, _)) = args {
            if letter != 'm' {
                return self.error(
                    args_pos,
                    format!("option '{letter}' does not expect arguments"),
                );
            }
        }

        let draft = &mut self.draft;
        match letter {
            'x' => draft.exit_on_condition = true,
            'n' => {
                let failures = match modifier {
                    Some(m) => m == '-',
                    None => draft.count_failures,
                };
                if failures {
                    draft.report.failures = true;
                } else {
                    draft.report.successes = true;
                }
            }
            'N' => {
                draft.report.successes = true;
                draft.report.failures = true;
            }
            'c' => draft.report.state = true,
            'q' => draft.report.silent = true,
            'm' => {
                draft.report.map = true;
                draft.max_map_size = Some(self.config.default_size);
                if let Some((args_pos, body)) = args {
                    self.parse_map_args(args_pos, &body)?;
                }
            }
            _ => unreachable!("letter checked against OPTION_LETTERS"),
        }
        Ok(())
    }

    /// Optional `'(' ... ')'`; returns the body and the position of its first character
    fn parse_arglist(&mut self) -> Result<Option<(usize, Vec<char>)>> {
        if self.peek() != Some('(') {
            return Ok(None);
        }
        self.pos += 1;

        let start = self.pos;
        loop {
            match self.bump() {
                Some(')') => break,
                Some(_) => {}
                None => {
                    return self.error(self.pos, "unexpected end-of-string looking for ')'");
                }
            }
        }

        Ok(Some((start, self.chars[start..self.pos - 1].to_vec())))
    }

    /// `digit* (':' char char)?`, positions reported relative to the whole spec
    fn parse_map_args(&mut self, start: usize, body: &[char]) -> Result<()> {
        let mut size: usize = 0;
        let mut i = 0;

        while let Some(c) = body.get(i).filter(|c| c.is_ascii_digit()) {
            let digit = c.to_digit(10).unwrap_or(0) as usize;
            size = match size.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => return self.error(start + i, "'m' arg map size is too large"),
            };
            i += 1;
        }

        if i > 0 {
            if size == 0 {
                return self.error(start + i, "'m' arg map size must be >0");
            }
            self.draft.max_map_size = Some(size);
        }

        match body.get(i) {
            None => Ok(()),
            Some(':') => {
                let glyphs = &body[i + 1..];
                if glyphs.len() != 2 {
                    return self.error(
                        start + i + 1,
                        "expecting exactly 2 characters after ':' in 'm' args",
                    );
                }
                self.draft.glyphs = MapGlyphs::new(glyphs[1], glyphs[0]);
                Ok(())
            }
            Some(c) => self.error(
                start + i,
                format!("invalid character ({c}) in args to option 'm', expecting digit or ':'"),
            ),
        }
    }

    fn finish(self) -> Result<Condition> {
        let draft = self.draft;
        if draft.expect < 1 {
            return Err(ConditionError::Configuration {
                spec: self.spec.to_string(),
                message: "exit condition must define an expected count different from zero"
                    .to_string(),
            });
        }

        let map = match draft.max_map_size {
            Some(size) => Some(PingMap::new(size, draft.glyphs, self.config)?),
            None => None,
        };

        Ok(Condition::new(
            draft.expect,
            draft.count_failures,
            draft.require_sequence,
            draft.exit_on_condition,
            draft.report,
            map,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_position(spec: &str) -> usize {
        match parse(spec) {
            Err(ConditionError::Syntax { position, .. }) => position,
            other => panic!("expected syntax error for {spec:?}, got {other:?}"),
        }
    }

    fn syntax_message(spec: &str) -> String {
        match parse(spec) {
            Err(ConditionError::Syntax { message, .. }) => message,
            other => panic!("expected syntax error for {spec:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_plain_count() {
        let c = parse("5:").unwrap();
        assert_eq!(c.expect(), 5);
        assert!(!c.counts_failures());
        assert!(!c.requires_sequence());
        assert!(!c.report_flags().any());
        assert!(c.ping_map().is_none());
    }

    #[test]
    fn test_parse_failure_sequence() {
        let c = parse("-12s:").unwrap();
        assert_eq!(c.expect(), 12);
        assert!(c.counts_failures());
        assert!(c.requires_sequence());
    }

    #[test]
    fn test_parse_all_options() {
        let c = parse("3:xNmcq").unwrap();
        let flags = c.report_flags();
        assert!(c.exits_on_condition());
        assert!(flags.successes && flags.failures && flags.map && flags.state && flags.silent);
        assert_eq!(c.max_map_size(), Some(100));
    }

    #[test]
    fn test_n_defaults_to_counted_kind() {
        let flags = parse("3:n").unwrap().report_flags();
        assert!(flags.successes && !flags.failures);

        let flags = parse("-3:n").unwrap().report_flags();
        assert!(!flags.successes && flags.failures);
    }

    #[test]
    fn test_n_modifiers() {
        let flags = parse("-3:+n").unwrap().report_flags();
        assert!(flags.successes && !flags.failures);

        let flags = parse("3:-n").unwrap().report_flags();
        assert!(!flags.successes && flags.failures);
    }

    #[test]
    fn test_n_and_big_n_combine() {
        let flags = parse("3:nN").unwrap().report_flags();
        assert!(flags.successes && flags.failures);
    }

    #[test]
    fn test_map_size_and_glyphs() {
        let c = parse("5:m(10:ab)").unwrap();
        assert_eq!(c.max_map_size(), Some(10));
        let map = c.ping_map().unwrap();
        assert_eq!(map.capacity(), 10);
        assert_eq!(map.glyphs(), MapGlyphs::new('b', 'a'));
    }

    #[test]
    fn test_map_glyphs_only() {
        let c = parse("5:m(:^_)").unwrap();
        assert_eq!(c.max_map_size(), Some(100));
        assert_eq!(c.ping_map().unwrap().glyphs(), MapGlyphs::new('_', '^'));
    }

    #[test]
    fn test_map_size_only() {
        let c = parse("5:m(2000)").unwrap();
        assert_eq!(c.max_map_size(), Some(2000));
        assert_eq!(c.ping_map().unwrap().capacity(), 512);
    }

    #[test]
    fn test_empty_map_args() {
        let c = parse("5:m()").unwrap();
        assert_eq!(c.max_map_size(), Some(100));
    }

    #[test]
    fn test_repeated_m_last_size_wins() {
        let c = parse("5:m(10:ab)m(20)").unwrap();
        assert_eq!(c.max_map_size(), Some(20));
        assert_eq!(c.ping_map().unwrap().glyphs(), MapGlyphs::new('b', 'a'));
    }

    #[test]
    fn test_custom_map_config() {
        let config = MapConfig::new().with_default_size(20).with_initial_max(10);
        let c = parse_with("5:m", &config).unwrap();
        assert_eq!(c.max_map_size(), Some(20));
        assert_eq!(c.ping_map().unwrap().capacity(), 10);
    }

    #[test]
    fn test_zero_default_map_size_is_configuration_error() {
        let config = MapConfig::new().with_default_size(0);
        match parse_with("5:m", &config) {
            Err(ConditionError::Configuration { spec, message }) => {
                assert_eq!(spec, "5:m");
                assert!(message.contains("default_size"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_growth_settings_rejected() {
        for config in [
            MapConfig::new().with_initial_max(0),
            MapConfig::new().with_extension(0),
        ] {
            assert!(matches!(
                parse_with("5:m(20)", &config),
                Err(ConditionError::Configuration { .. })
            ));
        }
    }

    #[test]
    fn test_zero_expect_is_configuration_error() {
        assert!(matches!(
            parse("0:x"),
            Err(ConditionError::Configuration { .. })
        ));
        assert!(matches!(
            parse("-000s:"),
            Err(ConditionError::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_spec() {
        assert_eq!(syntax_position(""), 0);
    }

    #[test]
    fn test_empty_count() {
        assert_eq!(syntax_position(":x"), 0);
        assert_eq!(syntax_position("-:x"), 1);
        assert!(syntax_message("-:x").contains("empty count"));
    }

    #[test]
    fn test_missing_colon() {
        assert_eq!(syntax_position("5"), 1);
        assert_eq!(syntax_position("5s"), 2);
    }

    #[test]
    fn test_bad_location_flag() {
        assert_eq!(syntax_position("5q:"), 1);
        assert!(syntax_message("5q:").contains("expect ':'"));
    }

    #[test]
    fn test_duplicate_location_flag() {
        assert_eq!(syntax_position("5ss:"), 2);
        assert!(syntax_message("5ss:").contains("repeat loc flag"));
    }

    #[test]
    fn test_unknown_option() {
        assert_eq!(syntax_position("5:xz"), 3);
        assert!(syntax_message("5:xz").contains("invalid option 'z'"));
    }

    #[test]
    fn test_modifier_on_other_option() {
        assert_eq!(syntax_position("5:+x"), 3);
        assert!(syntax_message("5:-N").contains("only allowed for 'n'"));
    }

    #[test]
    fn test_dangling_modifier() {
        assert_eq!(syntax_position("5:n+"), 4);
    }

    #[test]
    fn test_unterminated_args() {
        assert_eq!(syntax_position("5:m(10"), 6);
        assert!(syntax_message("5:m(10").contains("looking for ')'"));
    }

    #[test]
    fn test_args_on_other_option() {
        assert_eq!(syntax_position("5:n(3)"), 4);
    }

    #[test]
    fn test_wrong_glyph_count() {
        assert_eq!(syntax_position("5:m(10:abc)"), 7);
        assert_eq!(syntax_position("5:m(:a)"), 5);
        assert_eq!(syntax_position("5:m(:)"), 5);
    }

    #[test]
    fn test_zero_map_size() {
        assert_eq!(syntax_position("5:m(0)"), 5);
        assert_eq!(syntax_position("5:m(00:ab)"), 6);
    }

    #[test]
    fn test_invalid_map_arg_character() {
        assert_eq!(syntax_position("5:m(1x)"), 5);
    }

    #[test]
    fn test_count_overflow() {
        assert!(syntax_message("99999999999999999999999:").contains("too large"));
    }

    #[test]
    fn test_unicode_glyphs() {
        let c = parse("2:m(:✓✗)").unwrap();
        assert_eq!(c.ping_map().unwrap().glyphs(), MapGlyphs::new('✗', '✓'));
    }
}
