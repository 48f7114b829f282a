use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::{Data, DeriveInput, Fields, GenericParam, LitStr, Visibility, parse_macro_input, parse_quote};

/// Derive macro for records the field walkers can iterate.
///
/// Generates `fieldmap::Record` and `fieldmap::Reflect` impls. Only `pub`
/// fields are visible to the walkers; the rest keep their ordinal but are
/// never handed out.
///
/// The struct must implement `Clone` and `Debug`, and every field type must
/// implement `fieldmap::Reflect`.
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Clone, Debug, Default)]
/// pub struct Config {
///     #[fieldmap(tag = r#"env:"HOME""#)]
///     pub home: String,
///
///     #[fieldmap(embed)]
///     pub common: Common,
///
///     cache: Option<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(fieldmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record needs named fields; unit structs have none",
                ));
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record only supports structs",
            ));
        }
    };

    let mut decls = Vec::new();
    let mut ref_arms = Vec::new();
    let mut mut_arms = Vec::new();

    for (ordinal, field) in fields.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name = ident.to_string();
        let field_ty = &field.ty;

        // Parse #[fieldmap(...)] attribute.
        let mut tag: Option<LitStr> = None;
        let mut embed = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("fieldmap") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    tag = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("embed") {
                    embed = true;
                } else {
                    return Err(meta.error("unknown fieldmap attribute (expected `tag` or `embed`)"));
                }
                Ok(())
            })?;
        }

        let exported = matches!(field.vis, Visibility::Public(_));

        let tag_call = tag.map(|tag| quote! { .tag(#tag) });
        let embed_call = embed.then(|| quote! { .embedded() });
        let private_call = (!exported).then(|| quote! { .private() });

        decls.push(quote! {
            ::fieldmap::FieldDecl::new(
                #field_name,
                <#field_ty as ::fieldmap::Reflect>::type_desc(),
            )
            #tag_call
            #embed_call
            #private_call
        });

        if exported {
            let ordinal = Literal::usize_unsuffixed(ordinal);
            ref_arms.push(quote! {
                #ordinal => ::core::option::Option::Some(&self.#ident as &dyn ::fieldmap::Slot),
            });
            mut_arms.push(quote! {
                #ordinal => ::core::option::Option::Some(&mut self.#ident as &mut dyn ::fieldmap::Slot),
            });
        }
    }

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(param) = param {
            param.bounds.push(parse_quote!(::fieldmap::Reflect));
            param.bounds.push(parse_quote!(::core::clone::Clone));
            param.bounds.push(parse_quote!(::core::fmt::Debug));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Each instantiation of a generic record is its own record type.
    let record_name = if input.generics.type_params().next().is_some() {
        quote! { ::core::any::type_name::<Self>() }
    } else {
        quote! { #name_str }
    };

    let expanded = quote! {
        impl #impl_generics ::fieldmap::Record for #name #ty_generics #where_clause {
            fn record_name() -> &'static str {
                #record_name
            }

            fn field_decls() -> ::std::vec::Vec<::fieldmap::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn record_type(&self) -> ::fieldmap::RecordType {
                ::fieldmap::RecordType::of::<Self>()
            }

            #[allow(unreachable_patterns)]
            fn field(&self, ordinal: usize) -> ::core::option::Option<&dyn ::fieldmap::Slot> {
                match ordinal {
                    #(#ref_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unreachable_patterns)]
            fn field_mut(&mut self, ordinal: usize) -> ::core::option::Option<&mut dyn ::fieldmap::Slot> {
                match ordinal {
                    #(#mut_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn clone_record(&self) -> ::std::boxed::Box<dyn ::fieldmap::Record> {
                ::std::boxed::Box::new(::core::clone::Clone::clone(self))
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }

        impl #impl_generics ::fieldmap::Reflect for #name #ty_generics #where_clause {
            fn type_desc() -> ::fieldmap::TypeDesc {
                ::fieldmap::TypeDesc::Record(::fieldmap::RecordType::of::<Self>())
            }

            fn to_value(&self) -> ::fieldmap::Value {
                ::fieldmap::Value::Record(::std::boxed::Box::new(::core::clone::Clone::clone(self)))
            }

            fn into_value(self) -> ::fieldmap::Value {
                ::fieldmap::Value::Record(::std::boxed::Box::new(self))
            }

            fn from_value(value: ::fieldmap::Value) -> ::core::result::Result<Self, ::fieldmap::ConvertError> {
                ::fieldmap::reflect::record_from_value(value)
            }

            fn as_record_mut(&mut self) -> ::core::option::Option<&mut dyn ::fieldmap::Record> {
                ::core::option::Option::Some(self)
            }
        }
    };

    Ok(expanded.into())
}
