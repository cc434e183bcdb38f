use proc_macro::TokenStream;

mod actor_type;
mod common;

/// Derives the `ActorType` trait, binding a handler to its static type tag.
///
/// The tag is what callers put in `actorType` and what the handler registry
/// dispatches on. It is resolved at compile time, so the registry built at
/// startup is a closed set of known tags.
///
/// # Features
///
/// ## 1. Explicit Tag
/// ```rust,ignore
/// # use ordinal_api::ActorType;
/// #[derive(ActorType)]
/// #[actor(name = "teacher")]
/// struct TeacherHandler;
///
/// assert_eq!(<TeacherHandler as ordinal_api::handler::ActorType>::ACTOR_TYPE, "teacher");
/// ```
///
/// ## 2. Derived Tag
/// Without `name`, the tag is the snake_cased type name with a trailing
/// `Handler` or `Actor` removed.
/// ```rust,ignore
/// # use ordinal_api::ActorType;
/// #[derive(ActorType)]
/// struct ChatRoomHandler;
///
/// assert_eq!(<ChatRoomHandler as ordinal_api::handler::ActorType>::ACTOR_TYPE, "chat_room");
/// ```
///
/// # Generated Items
///
/// - `impl ordinal_api::handler::ActorType` with `ACTOR_TYPE`
/// - `fn actor_type(&self) -> &'static str` inherent helper
#[proc_macro_derive(ActorType, attributes(actor))]
pub fn derive_actor_type(input: TokenStream) -> TokenStream {
    actor_type::derive_actor_type_impl(input)
}
