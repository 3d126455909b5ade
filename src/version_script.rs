//! Support for version scripts. A version script attaches version names to
//! symbols and controls which symbols a shared object exports. The driver
//! reads the file named by --version-script and hands the text to
//! [`VersionScript::parse`]; the parsed form feeds version-id assignment at
//! symbol insertion and the post-resolution version scan.

use crate::error::Result;
use anyhow::anyhow;
use anyhow::bail;

/// A declared version. Version ids are assigned from 2 in declaration order;
/// 0 and 1 are reserved for VER_NDX_LOCAL and VER_NDX_GLOBAL.
#[derive(Debug, Default)]
pub struct Version {
    pub name: String,

    /// Glob patterns (`?` and `*`) naming the symbols this version covers.
    pub globals: Vec<String>,

    /// Patterns for symbols hidden from the dynamic table.
    pub locals: Vec<String>,
}

#[derive(Debug)]
pub struct VersionScript {
    /// Exact names from an anonymous `{ ... };` script. These declare no
    /// version of their own, they just force VER_NDX_GLOBAL.
    pub globals: Vec<String>,

    /// Declared versions, in script order.
    pub versions: Vec<Version>,

    /// False when the script hides unlisted symbols with a `local: *;` rule.
    /// Decides the version id of names without an `@` suffix.
    pub global_by_default: bool,
}

impl Default for VersionScript {
    fn default() -> Self {
        Self {
            globals: Vec::new(),
            versions: Vec::new(),
            global_by_default: true,
        }
    }
}

impl VersionScript {
    pub fn parse(text: &str) -> Result<VersionScript> {
        let mut tokens = Tokeniser::new(text);
        let mut script = VersionScript::default();

        while let Some(token) = tokens.next() {
            let name = if token == "{" {
                None
            } else {
                tokens.expect("{")?;
                Some(token)
            };

            let (globals, locals) = parse_version_body(&mut tokens)?;

            if locals.iter().any(|pattern| pattern == "*") {
                script.global_by_default = false;
            }

            match name {
                None => script.globals.extend(globals),
                Some(name) => script.versions.push(Version {
                    name: name.to_owned(),
                    globals,
                    locals,
                }),
            }
        }

        Ok(script)
    }

    /// Looks up a version by name as it appears after `@` in a symbol,
    /// returning its id.
    pub(crate) fn version_index(&self, version: &[u8]) -> Option<u16> {
        self.versions
            .iter()
            .position(|v| v.name.as_bytes() == version)
            .map(|i| (i + 2) as u16)
    }
}

fn parse_version_body(tokens: &mut Tokeniser) -> Result<(Vec<String>, Vec<String>)> {
    enum Section {
        Global,
        Local,
    }

    let mut globals = Vec::new();
    let mut locals = Vec::new();
    let mut section = Section::Global;

    loop {
        let token = tokens
            .next()
            .ok_or_else(|| anyhow!("Missing closing '}}' in version script"))?;
        match token {
            "}" => break,
            ";" => {}
            "global:" => section = Section::Global,
            "local:" => section = Section::Local,
            pattern => match section {
                Section::Global => globals.push(pattern.to_owned()),
                Section::Local => locals.push(pattern.to_owned()),
            },
        }
    }

    // A predecessor version may appear between '}' and ';'. We accept the
    // syntax, but version inheritance doesn't affect resolution.
    match tokens.next() {
        Some(";") => {}
        Some(_predecessor) => tokens.expect(";")?,
        None => bail!("Expected ';' after '}}' in version script"),
    }

    Ok((globals, locals))
}

struct Tokeniser<'a> {
    text: &'a str,
}

impl<'a> Tokeniser<'a> {
    fn new(text: &'a str) -> Self {
        Tokeniser { text }
    }

    fn next(&mut self) -> Option<&'a str> {
        loop {
            self.text = self.text.trim_start();
            if try_take(&mut self.text, "/*") {
                if take_up_to(&mut self.text, "*/").is_err() {
                    self.text = "";
                }
                continue;
            }
            if self.text.starts_with('#') {
                if take_up_to(&mut self.text, "\n").is_err() {
                    self.text = "";
                }
                continue;
            }
            if self.text.is_empty() {
                return None;
            }
            let bytes = self.text.as_bytes();
            let mut len = 0;
            for byte in bytes {
                if b" \n\t{};".contains(byte) {
                    break;
                }
                len += 1;
            }
            if len == 0 {
                len = 1;
            }
            let token = &self.text[..len];
            self.text = &self.text[len..];
            return Some(token);
        }
    }

    fn expect(&mut self, expected: &str) -> Result {
        let token = self
            .next()
            .ok_or_else(|| anyhow!("Expected token '{expected}', got end of input"))?;
        if token != expected {
            bail!("Expected token '{expected}', got '{token}'");
        }
        Ok(())
    }
}

fn try_take(input: &mut &str, pattern: &str) -> bool {
    if let Some(rest) = input.strip_prefix(pattern) {
        *input = rest;
        return true;
    }
    false
}

fn take_up_to<'a>(input: &mut &'a str, pattern: &str) -> Result<&'a str> {
    let end = input
        .find(pattern)
        .ok_or_else(|| anyhow!("Missing '{pattern}'"))?;
    let taken = &input[..end];
    *input = &input[end + pattern.len()..];
    Ok(taken)
}
