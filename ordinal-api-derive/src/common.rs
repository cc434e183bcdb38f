// Helpers shared by the derive implementations

/// Convert a syn::Error to a TokenStream that can be returned from a proc_macro function
pub fn to_compile_error(error: syn::Error) -> proc_macro::TokenStream {
    error.to_compile_error().into()
}

/// `ChatRoomHandler` -> `chat_room`
pub fn default_type_tag(type_name: &str) -> String {
    let trimmed = type_name
        .strip_suffix("Handler")
        .or_else(|| type_name.strip_suffix("Actor"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(type_name);

    let mut tag = String::with_capacity(trimmed.len() + 4);
    for (i, ch) in trimmed.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                tag.push('_');
            }
            tag.extend(ch.to_lowercase());
        } else {
            tag.push(ch);
        }
    }
    tag
}
