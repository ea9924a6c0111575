use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// (type name, doc line, name lookup fn, reverse lookup fn, parse error label)
const CODE_TYPES: &[(&str, &str, &str, &str, &str)] = &[
    (
        "KeyCode",
        "A physical keyboard key code (Linux input-event-codes.h numbering).",
        "key_name",
        "key_from_name",
        "key",
    ),
    (
        "ConsumerKeyCode",
        "A consumer/media key code (volume, brightness, playback, ...).",
        "consumer_key_name",
        "consumer_key_from_name",
        "consumer key",
    ),
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).unwrap();

    for (ty, doc, name_fn, from_name_fn, label) in CODE_TYPES {
        writeln!(
            f,
            r#"
/// {doc}
///
/// This is a newtype wrapper around u16 for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct {ty}(pub u16);

impl {ty} {{
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {{
        self.0
    }}

    /// Get the name of this code
    pub fn name(self) -> &'static str {{
        {name_fn}(self.0)
    }}
}}

impl From<u16> for {ty} {{
    fn from(code: u16) -> Self {{
        {ty}(code)
    }}
}}

impl From<{ty}> for u16 {{
    fn from(key: {ty}) -> Self {{
        key.0
    }}
}}

impl fmt::Display for {ty} {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        write!(f, "{{}}", self.name())
    }}
}}

impl FromStr for {ty} {{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {{
        {from_name_fn}(s).ok_or_else(|| format!("Unknown {label}: {{}}", s))
    }}
}}
"#
        )
        .unwrap();
    }

    println!("cargo:rerun-if-changed=build.rs");
}
