/// Generate typed async getters and setters for text-valued datastream
/// attributes on top of `Datastream::get` / `Datastream::set`.
///
/// # Usage
/// ```ignore
/// impl Datastream {
///     text_accessors! {
///         /// Human readable label
///         label, set_label => DsAttribute::DsLabel;
///     }
/// }
/// ```
macro_rules! text_accessors {
    ($($(#[$meta:meta])* $getter:ident, $setter:ident => $attr:expr;)*) => {
        $(
            $(#[$meta])*
            pub async fn $getter(&mut self) -> $crate::error::Result<Option<String>> {
                Ok(self
                    .get($attr)
                    .await?
                    .and_then(|v| v.as_str().map(str::to_string)))
            }

            pub fn $setter(&mut self, value: impl Into<String>) -> $crate::error::Result<()> {
                self.set($attr, $crate::value::Value::Text(value.into()))
            }
        )*
    };
}
