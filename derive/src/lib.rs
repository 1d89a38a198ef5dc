extern crate proc_macro;

use itertools::izip;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type,
};

/// The protobuf field-number ceiling, 2^29 - 1.
const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Field attributes parsed from `#[pb(...)]` annotations
///
/// # Fields
///
/// * `number` - Explicit field number for this field (positional otherwise)
/// * `oneof` - Whether the field's type is a variant (`Oneof`) spanning a
///   range of field numbers
#[derive(Debug, Clone, Default)]
struct FieldAttributes {
    number: Option<u32>,
    oneof: bool,
}

/// Extract and parse `#[pb(...)]` attribute values from field attributes
///
/// # Supported Attributes
///
/// * `#[pb(number = N)]` - Explicit field number (1..=2^29-1)
/// * `#[pb(oneof)]` - The field's type derives `Oneof`
///
/// Multiple attributes can be combined: `#[pb(number = 7, oneof)]`
fn get_field_attributes(attrs: &[Attribute], field_name: &str) -> FieldAttributes {
    let mut result = FieldAttributes::default();

    for attr in attrs {
        if attr.path().is_ident("pb") {
            let parsed = attr.parse_args_with(|input: syn::parse::ParseStream| {
                let mut parsed_number = None;
                let mut parsed_oneof = false;

                while !input.is_empty() {
                    let ident = input.parse::<syn::Ident>()?;

                    if ident == "number" {
                        input.parse::<syn::Token![=]>()?;
                        let lit = input.parse::<syn::LitInt>()?;
                        let value = lit.base10_parse::<u32>()?;
                        if value == 0 {
                            return Err(syn::Error::new(
                                lit.span(),
                                "Field number 0 is not a valid proto field number",
                            ));
                        }
                        if value > MAX_FIELD_NUMBER {
                            return Err(syn::Error::new(
                                lit.span(),
                                format!(
                                    "Field number {} exceeds the protobuf maximum of {}",
                                    value, MAX_FIELD_NUMBER
                                ),
                            ));
                        }
                        parsed_number = Some(value);
                    } else if ident == "oneof" {
                        parsed_oneof = true;
                    } else {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!("Unknown attribute: {}", ident),
                        ));
                    }

                    if input.peek(syn::Token![,]) {
                        input.parse::<syn::Token![,]>()?;
                    }
                }

                Ok((parsed_number, parsed_oneof))
            });

            match parsed {
                Ok((parsed_number, parsed_oneof)) => {
                    if let Some(number) = parsed_number {
                        result.number = Some(number);
                    }
                    result.oneof = result.oneof || parsed_oneof;
                }
                Err(e) => {
                    panic!(
                        "#[pb(...)] attribute for field '{}' is not in the correct format: {}",
                        field_name, e
                    );
                }
            }
        }
    }

    result
}

/// The container shape of a field, detected syntactically from its type.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldShape {
    /// A scalar, string, bytes, enumeration or nested message.
    Singular,
    /// `Option<T>`: explicit presence.
    Optional,
    /// `Vec<T>` with `T != u8`: unpacked repeated.
    Repeated,
    /// `HashMap<K, V>` or `BTreeMap<K, V>`: map entries.
    Map,
    /// `#[pb(oneof)]`: a variant spanning several field numbers.
    Oneof,
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    if let Type::Path(type_path) = ty {
        type_path.path.segments.last()
    } else {
        None
    }
}

fn type_arguments(segment: &syn::PathSegment) -> Vec<&Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        args.args
            .iter()
            .filter_map(|arg| {
                if let GenericArgument::Type(ty) = arg {
                    Some(ty)
                } else {
                    None
                }
            })
            .collect()
    } else {
        Vec::new()
    }
}

fn is_ident(ty: &Type, name: &str) -> bool {
    last_segment(ty).map_or(false, |seg| seg.ident == name)
}

/// Classify a field's container shape. `Vec<u8>` stays singular: it is the
/// proto `bytes` scalar, not a repeated field.
fn field_shape(ty: &Type, attrs: &FieldAttributes) -> FieldShape {
    if attrs.oneof {
        return FieldShape::Oneof;
    }
    if let Some(segment) = last_segment(ty) {
        if segment.ident == "Option" {
            return FieldShape::Optional;
        }
        if segment.ident == "Vec" {
            let inner_is_u8 = type_arguments(segment)
                .first()
                .map_or(false, |inner| is_ident(inner, "u8"));
            return if inner_is_u8 {
                FieldShape::Singular
            } else {
                FieldShape::Repeated
            };
        }
        if segment.ident == "HashMap" || segment.ident == "BTreeMap" {
            return FieldShape::Map;
        }
    }
    FieldShape::Singular
}

/// Derive macro for implementing the `Message` and `Value` traits
///
/// Applies to structs with named fields. Field numbers are assigned
/// positionally starting at 1 in declaration order; a `#[pb(oneof)]` field
/// advances the counter by the variant's alternative count, and
/// `#[pb(number = N)]` pins a field to an explicit number with later fields
/// continuing from there. A pinned number that collides with another field's
/// number, or lands inside a preceding oneof's range, fails compilation.
///
/// # Examples
///
/// ```ignore
/// #[derive(Message, Default, PartialEq, Debug)]
/// struct MyStruct {
///     #[pb(number = 7)]
///     field1: i32,
///     field2: String, // number 8
/// }
/// ```
#[proc_macro_derive(Message, attributes(pb))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("#[derive(Message)] supports only structs with named fields"),
        },
        _ => panic!("#[derive(Message)] supports only structs; use #[derive(Oneof)] or #[derive(Enumeration)] for enums"),
    };

    let mut field_idents = Vec::new();
    let mut field_types = Vec::new();
    let mut field_shapes = Vec::new();
    let mut number_consts = Vec::new();
    let mut number_idents = Vec::new();
    let mut span_tokens = Vec::new();

    // Field numbers are built as a chain of consts so a oneof's span, known
    // only to its own derive, composes into the numbering of later fields.
    let mut next_number = quote! { 1u32 };
    for f in fields {
        let field_ident = f.ident.as_ref().unwrap().clone();
        let field_name_str = field_ident.to_string();
        let attrs = get_field_attributes(&f.attrs, &field_name_str);
        let shape = field_shape(&f.ty, &attrs);
        let ty = f.ty.clone();

        let number_ident = format_ident!("NUM_{}", field_name_str.to_uppercase());
        let base = match attrs.number {
            Some(number) => quote! { #number },
            None => next_number.clone(),
        };
        number_consts.push(quote! { const #number_ident: u32 = #base; });

        let span = if shape == FieldShape::Oneof {
            quote! { <#ty as protoflect::Oneof>::VARIANTS }
        } else {
            quote! { 1u32 }
        };
        next_number = quote! { #number_ident + #span };

        field_idents.push(field_ident);
        field_types.push(ty);
        field_shapes.push(shape);
        number_idents.push(number_ident);
        span_tokens.push(span);
    }

    // Numbers and oneof spans are const expressions resolved after expansion,
    // so uniqueness cannot be checked here. Emit assertions over the consts
    // instead: every field's range must stay within the protobuf ceiling and
    // be disjoint from every other field's range.
    let mut number_checks = Vec::new();
    for i in 0..number_idents.len() {
        let (num_a, span_a) = (&number_idents[i], &span_tokens[i]);
        number_checks.push(quote! {
            const _: () = assert!(
                #num_a + #span_a - 1u32 <= protoflect::wire::MAX_FIELD_NUMBER,
                "field number exceeds the protobuf maximum of 2^29 - 1"
            );
        });
        for j in (i + 1)..number_idents.len() {
            let (num_b, span_b) = (&number_idents[j], &span_tokens[j]);
            number_checks.push(quote! {
                const _: () = assert!(
                    #num_a + #span_a <= #num_b || #num_b + #span_b <= #num_a,
                    "duplicate or overlapping field numbers; adjust #[pb(number = ...)]"
                );
            });
        }
    }

    let mut encode_stmts = Vec::new();
    let mut size_terms = Vec::new();
    let mut merge_arms = Vec::new();

    for (ident, ty, shape, number) in izip!(
        field_idents.iter(),
        field_types.iter(),
        field_shapes.iter(),
        number_idents.iter()
    ) {
        match shape {
            FieldShape::Singular => {
                encode_stmts.push(quote! {
                    protoflect::encode_field(#number, &self.#ident, writer);
                });
                size_terms.push(quote! {
                    protoflect::field_size(#number, &self.#ident)
                });
                merge_arms.push(quote! {
                    n if n == #number => {
                        protoflect::merge_singular(&mut self.#ident, wire_type, reader, depth)
                    }
                });
            }
            FieldShape::Optional => {
                encode_stmts.push(quote! {
                    protoflect::encode_optional(#number, &self.#ident, writer);
                });
                size_terms.push(quote! {
                    protoflect::optional_size(#number, &self.#ident)
                });
                merge_arms.push(quote! {
                    n if n == #number => {
                        protoflect::merge_optional(&mut self.#ident, wire_type, reader, depth)
                    }
                });
            }
            FieldShape::Repeated => {
                encode_stmts.push(quote! {
                    protoflect::encode_repeated(#number, &self.#ident, writer);
                });
                size_terms.push(quote! {
                    protoflect::repeated_size(#number, &self.#ident)
                });
                merge_arms.push(quote! {
                    n if n == #number => {
                        protoflect::merge_repeated(&mut self.#ident, wire_type, reader, depth)
                    }
                });
            }
            FieldShape::Map => {
                encode_stmts.push(quote! {
                    for (key, value) in &self.#ident {
                        protoflect::encode_map_entry(#number, key, value, writer);
                    }
                });
                size_terms.push(quote! {
                    self.#ident
                        .iter()
                        .map(|(key, value)| protoflect::map_entry_size(#number, key, value))
                        .sum::<usize>()
                });
                merge_arms.push(quote! {
                    n if n == #number => {
                        let (key, value) = protoflect::merge_map_entry(wire_type, reader, depth)?;
                        self.#ident.insert(key, value);
                        Ok(())
                    }
                });
            }
            FieldShape::Oneof => {
                encode_stmts.push(quote! {
                    protoflect::Oneof::encode_oneof(&self.#ident, #number, writer);
                });
                size_terms.push(quote! {
                    protoflect::Oneof::oneof_size(&self.#ident, #number)
                });
                merge_arms.push(quote! {
                    n if n >= #number && n < #number + <#ty as protoflect::Oneof>::VARIANTS => {
                        protoflect::Oneof::merge_oneof(
                            &mut self.#ident, n, #number, wire_type, reader, depth,
                        )
                    }
                });
            }
        }
    }

    TokenStream::from(quote! {
        const _: () = {
            #(#number_consts)*
            #(#number_checks)*

            impl #impl_generics protoflect::Message for #name #ty_generics #where_clause {
                fn encode_raw(&self, writer: &mut protoflect::bytes::BytesMut) {
                    #(#encode_stmts)*
                }

                fn merge_field(
                    &mut self,
                    number: u32,
                    wire_type: protoflect::WireType,
                    reader: &mut protoflect::bytes::Bytes,
                    depth: usize,
                ) -> protoflect::Result<()> {
                    match number {
                        #(#merge_arms)*
                        _unknown => protoflect::wire::skip_field(wire_type, reader),
                    }
                }

                fn encoded_size(&self) -> usize {
                    0usize #(+ #size_terms)*
                }
            }

            impl #impl_generics protoflect::Value for #name #ty_generics #where_clause {
                const WIRE_TYPE: protoflect::WireType = protoflect::WireType::LengthDelimited;

                fn encode_value(&self, writer: &mut protoflect::bytes::BytesMut) {
                    let size = protoflect::Message::encoded_size(self);
                    protoflect::wire::encode_varint(size as u64, writer);
                    protoflect::Message::encode_raw(self, writer);
                }

                fn merge_value(
                    &mut self,
                    reader: &mut protoflect::bytes::Bytes,
                    depth: usize,
                ) -> protoflect::Result<()> {
                    if depth >= protoflect::wire::RECURSION_LIMIT {
                        return Err(protoflect::CodecError::MaxDepthExceeded(
                            protoflect::wire::RECURSION_LIMIT,
                        ));
                    }
                    let mut body = protoflect::wire::take_length_delimited(reader)?;
                    protoflect::Message::merge(self, &mut body, depth + 1)
                }

                fn value_size(&self) -> usize {
                    let size = protoflect::Message::encoded_size(self);
                    protoflect::wire::varint_len(size as u64) + size
                }

                fn is_default(&self) -> bool {
                    protoflect::Message::encoded_size(self) == 0
                }
            }
        };
    })
}

/// Derive macro for proto enum support
///
/// Applies to fieldless enums, which encode as the varint of their
/// discriminant (proto `int32` semantics). The first variant should map to
/// discriminant 0, the proto3 default. The enum must also derive
/// `Clone, Copy`.
///
/// # Examples
///
/// ```ignore
/// #[derive(Enumeration, Clone, Copy, Default, PartialEq, Debug)]
/// enum Color {
///     #[default]
///     Red,
///     Black,
/// }
/// ```
#[proc_macro_derive(Enumeration)]
pub fn derive_enumeration(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(e) => &e.variants,
        _ => panic!("#[derive(Enumeration)] supports only enums"),
    };

    let mut variant_idents = Vec::new();
    for v in variants {
        if !matches!(v.fields, Fields::Unit) {
            panic!(
                "#[derive(Enumeration)] supports only fieldless enums; variant '{}::{}' carries data",
                name, v.ident
            );
        }
        variant_idents.push(v.ident.clone());
    }
    if variant_idents.is_empty() {
        panic!("#[derive(Enumeration)] requires at least one variant for enum '{}'", name);
    }

    TokenStream::from(quote! {
        impl protoflect::Value for #name {
            const WIRE_TYPE: protoflect::WireType = protoflect::WireType::Varint;

            fn encode_value(&self, writer: &mut protoflect::bytes::BytesMut) {
                protoflect::wire::encode_varint(*self as i32 as i64 as u64, writer);
            }

            fn merge_value(
                &mut self,
                reader: &mut protoflect::bytes::Bytes,
                _depth: usize,
            ) -> protoflect::Result<()> {
                let raw = protoflect::wire::decode_varint(reader)? as i32;
                *self = match raw {
                    #(x if x == #name::#variant_idents as i32 => #name::#variant_idents,)*
                    other => {
                        return Err(protoflect::CodecError::Decode(format!(
                            "unknown value {} for enum {}",
                            other,
                            stringify!(#name)
                        )))
                    }
                };
                Ok(())
            }

            fn value_size(&self) -> usize {
                protoflect::wire::varint_len(*self as i32 as i64 as u64)
            }

            fn is_default(&self) -> bool {
                (*self as i32) == 0
            }
        }
    })
}

/// Derive macro for variant (oneof) field support
///
/// Applies to enums whose variants each hold exactly one unnamed value.
/// Alternative `i` (zero-based, declaration order) is addressed at field
/// number `base + i`, where `base` is the field number of the struct field
/// carrying the variant. Also generates `Default` (the first alternative
/// with a default payload), so do not derive `Default` separately.
///
/// # Examples
///
/// ```ignore
/// #[derive(Oneof, PartialEq, Debug)]
/// enum Payload {
///     Num(f64),
///     Name(String),
/// }
/// ```
#[proc_macro_derive(Oneof)]
pub fn derive_oneof(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(e) => &e.variants,
        _ => panic!("#[derive(Oneof)] supports only enums"),
    };

    let mut variant_idents = Vec::new();
    let mut variant_types = Vec::new();
    for v in variants {
        match &v.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                variant_idents.push(v.ident.clone());
                variant_types.push(fields.unnamed.first().unwrap().ty.clone());
            }
            _ => panic!(
                "#[derive(Oneof)] requires every variant to hold exactly one unnamed value; '{}::{}' does not",
                name, v.ident
            ),
        }
    }
    if variant_idents.is_empty() {
        panic!("#[derive(Oneof)] requires at least one variant for enum '{}'", name);
    }

    let count = variant_idents.len() as u32;
    let offsets: Vec<u32> = (0..count).collect();
    let first_variant = &variant_idents[0];

    let encode_arms = izip!(variant_idents.iter(), offsets.iter()).map(|(ident, offset)| {
        quote! {
            #name::#ident(value) => protoflect::encode_oneof_field(base + #offset, value, writer),
        }
    });
    let size_arms = izip!(variant_idents.iter(), offsets.iter()).map(|(ident, offset)| {
        quote! {
            #name::#ident(value) => protoflect::oneof_field_size(base + #offset, value),
        }
    });
    let merge_arms = izip!(variant_idents.iter(), variant_types.iter(), offsets.iter()).map(
        |(ident, ty, offset)| {
            quote! {
                #offset => {
                    let mut value = <#ty as ::std::default::Default>::default();
                    protoflect::merge_singular(&mut value, wire_type, reader, depth)?;
                    *self = #name::#ident(value);
                    Ok(())
                }
            }
        },
    );

    TokenStream::from(quote! {
        impl protoflect::Oneof for #name {
            const VARIANTS: u32 = #count;

            fn encode_oneof(&self, base: u32, writer: &mut protoflect::bytes::BytesMut) {
                match self {
                    #(#encode_arms)*
                }
            }

            fn merge_oneof(
                &mut self,
                number: u32,
                base: u32,
                wire_type: protoflect::WireType,
                reader: &mut protoflect::bytes::Bytes,
                depth: usize,
            ) -> protoflect::Result<()> {
                match number - base {
                    #(#merge_arms)*
                    _out_of_range => protoflect::wire::skip_field(wire_type, reader),
                }
            }

            fn oneof_size(&self, base: u32) -> usize {
                match self {
                    #(#size_arms)*
                }
            }
        }

        impl ::std::default::Default for #name {
            fn default() -> Self {
                #name::#first_variant(::std::default::Default::default())
            }
        }
    })
}
