/// Settings that shape how a `Selector` prepares expressions before compiling them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectConfig {
    /// The literal marker replaced by caller arguments, left to right.
    ///
    /// Defaults to `{}`.
    pub placeholder: String,
    /// What happens when an expression holds more markers than there are arguments.
    ///
    /// - **true**: the call fails with `SelectError::MissingPlaceholderArgument`.
    /// - **false**: the surplus markers are left in the expression as written.
    ///
    /// Defaults to `true`.
    pub strict_placeholders: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            placeholder: "{}".to_string(),
            strict_placeholders: true,
        }
    }
}
