// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Proc Macros
//!
//! We use proc macros. Proc macros have to go in their own crates.  Feels like a scam.  Enough
//! complaining.
//!
//! ## `capability_blocks!`
//!
//! Vulkan grows new `VkPhysicalDevice*Features` structures with every revision.  Writing a checker
//! per structure is a losing game, so every structure is described once, as data, and this macro
//! writes both the schema table and the accessors that touch the real ash structures:
//!
//! ```ignore
//! capability_blocks! {
//!     /// Core 1.0 toggles.  Always the head of a chain.
//!     head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] {
//!         robust_buffer_access,
//!         wide_lines,
//!     }
//!
//!     #[extension(vk::KHR_SYNCHRONIZATION2_NAME)]
//!     #[promoted(1, 3)]
//!     Synchronization2 = vk::PhysicalDeviceSynchronization2Features<'static>
//!         [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
//! }
//! ```
//!
//! The expansion emits `enum Block`, `static SCHEMAS`, `const HEAD_BLOCK` and the `Block`
//! accessors.  It expects `vk`, `BlockSchema`, `FieldDescriptor` and `FieldKind` to be in scope
//! where it is invoked.  Chained blocks get `s_type` and `p_next` as fields 0 and 1, so flag indexes
//! line up with the C structure layout.

use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    braced, bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Attribute, Ident, LitInt, LitStr, Path, Token, Type,
};

mod kw {
    syn::custom_keyword!(head);
}

#[proc_macro]
pub fn capability_blocks(input: TokenStream) -> TokenStream {
    let registry = parse_macro_input!(input as Registry);
    expand(&registry).into()
}

struct BlockDef {
    docs: Vec<Attribute>,
    head: bool,
    variant: Ident,
    ty: Type,
    s_type: Ident,
    extension: Option<Path>,
    promoted: Option<(LitInt, LitInt)>,
    fields: Vec<Ident>,
}

impl BlockDef {
    /// `vk::PhysicalDeviceVulkan12Features<'static>` is reported as `VkPhysicalDeviceVulkan12Features`.
    fn c_name(&self) -> syn::Result<String> {
        match &self.ty {
            Type::Path(tp) => tp
                .path
                .segments
                .last()
                .map(|seg| format!("Vk{}", seg.ident))
                .ok_or_else(|| syn::Error::new_spanned(&self.ty, "empty type path")),
            other => Err(syn::Error::new_spanned(
                other,
                "capability blocks must be named ash structure types",
            )),
        }
    }

    /// Chained blocks lead with `s_type` and `p_next`.
    fn first_flag(&self) -> usize {
        if self.head { 0 } else { 2 }
    }
}

impl Parse for BlockDef {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let mut docs = Vec::new();
        let mut extension = None;
        let mut promoted = None;
        for attr in attrs {
            if attr.path().is_ident("doc") {
                docs.push(attr);
            } else if attr.path().is_ident("extension") {
                extension = Some(attr.parse_args::<Path>()?);
            } else if attr.path().is_ident("promoted") {
                let version =
                    attr.parse_args_with(Punctuated::<LitInt, Token![,]>::parse_terminated)?;
                let mut parts = version.into_iter();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(major), Some(minor), None) => promoted = Some((major, minor)),
                    _ => {
                        return Err(syn::Error::new_spanned(
                            attr,
                            "expected #[promoted(major, minor)]",
                        ));
                    }
                }
            } else {
                return Err(syn::Error::new_spanned(
                    attr,
                    "unknown block attribute, expected doc, extension or promoted",
                ));
            }
        }

        let head = if input.peek(kw::head) {
            input.parse::<kw::head>()?;
            true
        } else {
            false
        };

        let variant: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let ty: Type = input.parse()?;

        let s_type_content;
        bracketed!(s_type_content in input);
        let s_type: Ident = s_type_content.parse()?;

        let field_content;
        braced!(field_content in input);
        let fields: Vec<Ident> = Punctuated::<Ident, Token![,]>::parse_terminated(&field_content)?
            .into_iter()
            .collect();

        if fields.is_empty() {
            return Err(syn::Error::new_spanned(&variant, "block declares no flags"));
        }
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.to_string()) {
                return Err(syn::Error::new_spanned(f, "flag declared twice"));
            }
        }
        if head && (extension.is_some() || promoted.is_some()) {
            return Err(syn::Error::new_spanned(
                &variant,
                "the head block is core and cannot name an extension",
            ));
        }

        Ok(BlockDef {
            docs,
            head,
            variant,
            ty,
            s_type,
            extension,
            promoted,
            fields,
        })
    }
}

struct Registry {
    blocks: Vec<BlockDef>,
}

impl Parse for Registry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut blocks: Vec<BlockDef> = Vec::new();
        while !input.is_empty() {
            blocks.push(input.parse()?);
        }

        let Some(first) = blocks.first() else {
            return Err(syn::Error::new(Span::call_site(), "no capability blocks"));
        };
        if !first.head {
            return Err(syn::Error::new_spanned(
                &first.variant,
                "the first block must be the head block",
            ));
        }

        let mut variants = HashSet::new();
        let mut s_types = HashSet::new();
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 && block.head {
                return Err(syn::Error::new_spanned(
                    &block.variant,
                    "only one head block is allowed",
                ));
            }
            if !variants.insert(block.variant.to_string()) {
                return Err(syn::Error::new_spanned(&block.variant, "duplicate block"));
            }
            if !s_types.insert(block.s_type.to_string()) {
                return Err(syn::Error::new_spanned(
                    &block.s_type,
                    "structure type used by two blocks",
                ));
            }
            block.c_name()?;
        }

        Ok(Registry { blocks })
    }
}

fn expand(registry: &Registry) -> TokenStream2 {
    let blocks = &registry.blocks;
    let head_s_type = &blocks[0].s_type;

    let variants = blocks.iter().map(|b| {
        let docs = &b.docs;
        let variant = &b.variant;
        let ty = &b.ty;
        quote! { #(#docs)* #variant(#ty) }
    });

    let schemas = blocks.iter().map(|b| {
        let ty = &b.ty;
        let s_type = &b.s_type;
        // Validated while parsing.
        let name = LitStr::new(&b.c_name().unwrap_or_default(), Span::call_site());
        let variant = LitStr::new(&b.variant.to_string(), Span::call_site());
        let chained = !b.head;
        let extension = match &b.extension {
            Some(path) => quote! { ::core::option::Option::Some(#path) },
            None => quote! { ::core::option::Option::None },
        };
        let promoted = match &b.promoted {
            Some((major, minor)) => {
                quote! { ::core::option::Option::Some(vk::make_api_version(0, #major, #minor, 0)) }
            }
            None => quote! { ::core::option::Option::None },
        };
        let header = if b.head {
            quote! {}
        } else {
            quote! {
                FieldDescriptor {
                    kind: FieldKind::StructureType,
                    offset: ::core::mem::offset_of!(#ty, s_type),
                    name: "s_type",
                },
                FieldDescriptor {
                    kind: FieldKind::Pointer,
                    offset: ::core::mem::offset_of!(#ty, p_next),
                    name: "p_next",
                },
            }
        };
        let flags = b.fields.iter().map(|f| {
            let f_name = LitStr::new(&f.to_string(), f.span());
            quote! {
                FieldDescriptor {
                    kind: FieldKind::Bool,
                    offset: ::core::mem::offset_of!(#ty, #f),
                    name: #f_name,
                }
            }
        });
        quote! {
            BlockSchema {
                id: vk::StructureType::#s_type,
                name: #name,
                variant: #variant,
                size: ::core::mem::size_of::<#ty>(),
                chained: #chained,
                extension: #extension,
                promoted: #promoted,
                fields: &[#header #(#flags),*],
            }
        }
    });

    let new_arms = blocks.iter().map(|b| {
        let variant = &b.variant;
        let s_type = &b.s_type;
        quote! {
            vk::StructureType::#s_type => ::core::option::Option::Some(
                Block::#variant(::core::default::Default::default())
            ),
        }
    });

    let id_arms = blocks.iter().map(|b| {
        let variant = &b.variant;
        let s_type = &b.s_type;
        quote! { Block::#variant(_) => vk::StructureType::#s_type, }
    });

    let schema_arms = blocks.iter().enumerate().map(|(i, b)| {
        let variant = &b.variant;
        quote! { Block::#variant(_) => &SCHEMAS[#i], }
    });

    let get_arms = blocks.iter().flat_map(|b| {
        let variant = &b.variant;
        let first = b.first_flag();
        b.fields.iter().enumerate().map(move |(i, f)| {
            let index = first + i;
            quote! { (Block::#variant(b), #index) => ::core::option::Option::Some(b.#f == vk::TRUE), }
        })
    });

    let set_arms = blocks.iter().flat_map(|b| {
        let variant = &b.variant;
        let first = b.first_flag();
        b.fields.iter().enumerate().map(move |(i, f)| {
            let index = first + i;
            quote! { (Block::#variant(b), #index) => { b.#f = value; true } }
        })
    });

    let next_arms = blocks.iter().filter(|b| !b.head).map(|b| {
        let variant = &b.variant;
        quote! { Block::#variant(b) => b.p_next = next, }
    });

    let ptr_arms = blocks.iter().map(|b| {
        let variant = &b.variant;
        let ty = &b.ty;
        quote! { Block::#variant(b) => b as *mut #ty as *mut ::core::ffi::c_void, }
    });

    quote! {
        /// One instance of a known capability block.  Each variant wraps the real ash structure.
        #[derive(Clone, Copy, Debug)]
        pub enum Block {
            #(#variants,)*
        }

        /// The identifier of the head block, which every chain owns exactly once.
        pub const HEAD_BLOCK: vk::StructureType = vk::StructureType::#head_s_type;

        /// Every known block, in declaration order.
        pub static SCHEMAS: &[BlockSchema] = &[#(#schemas),*];

        impl Block {
            /// A zeroed block tagged with `id`, or `None` for unknown identifiers.
            pub fn new(id: vk::StructureType) -> ::core::option::Option<Self> {
                match id {
                    #(#new_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            pub fn id(&self) -> vk::StructureType {
                match self {
                    #(#id_arms)*
                }
            }

            pub fn schema(&self) -> &'static BlockSchema {
                match self {
                    #(#schema_arms)*
                }
            }

            /// Read the flag at schema index `field`.  `None` when the field is not a flag.
            pub fn flag(&self, field: usize) -> ::core::option::Option<bool> {
                match (self, field) {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            /// Write the flag at schema index `field`.  Returns false when the field is not a flag.
            pub fn set_flag(&mut self, field: usize, value: bool) -> bool {
                let value = if value { vk::TRUE } else { vk::FALSE };
                match (self, field) {
                    #(#set_arms)*
                    _ => false,
                }
            }

            /// Point `p_next` at `next`.  The head block has no `p_next` and ignores this.
            pub fn set_next(&mut self, next: *mut ::core::ffi::c_void) {
                match self {
                    #(#next_arms)*
                    _ => {}
                }
            }

            pub fn as_mut_ptr(&mut self) -> *mut ::core::ffi::c_void {
                match self {
                    #(#ptr_arms)*
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(tokens: TokenStream2) -> syn::Result<Registry> {
        syn::parse2::<Registry>(tokens)
    }

    #[test]
    fn test_parse_head_and_chained() {
        let registry = parse(quote! {
            /// core
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] {
                robust_buffer_access,
                wide_lines,
            }
            #[extension(vk::KHR_SYNCHRONIZATION2_NAME)]
            #[promoted(1, 3)]
            Synchronization2 = vk::PhysicalDeviceSynchronization2Features<'static>
                [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
        })
        .unwrap();

        assert_eq!(registry.blocks.len(), 2);
        assert!(registry.blocks[0].head);
        assert_eq!(registry.blocks[0].docs.len(), 1);
        assert_eq!(registry.blocks[0].first_flag(), 0);
        assert_eq!(registry.blocks[1].first_flag(), 2);
        assert!(registry.blocks[1].extension.is_some());
        assert_eq!(
            registry.blocks[1].c_name().unwrap(),
            "VkPhysicalDeviceSynchronization2Features"
        );
    }

    #[test]
    fn test_expansion_names_flags_by_schema_index() {
        let registry = parse(quote! {
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] { wide_lines }
            Sync2 = vk::PhysicalDeviceSynchronization2Features<'static>
                [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
        })
        .unwrap();
        let out = expand(&registry).to_string();

        assert!(out.contains("pub enum Block"));
        assert!(out.contains("HEAD_BLOCK"));
        assert!(out.contains("\"VkPhysicalDeviceFeatures\""));
        assert!(out.contains("\"VkPhysicalDeviceSynchronization2Features\""));
        assert!(out.contains("\"p_next\""));
        // `synchronization2` sits behind s_type and p_next.
        assert!(out.contains("2usize"));
    }

    #[test]
    fn test_head_must_come_first() {
        let err = parse(quote! {
            Sync2 = vk::PhysicalDeviceSynchronization2Features<'static>
                [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] { wide_lines }
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_duplicates() {
        let dup_flag = parse(quote! {
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] {
                wide_lines,
                wide_lines,
            }
        });
        assert!(dup_flag.is_err());

        let dup_s_type = parse(quote! {
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] { wide_lines }
            A = vk::PhysicalDeviceSynchronization2Features<'static>
                [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
            B = vk::PhysicalDeviceSynchronization2Features<'static>
                [PHYSICAL_DEVICE_SYNCHRONIZATION_2_FEATURES] { synchronization2 }
        });
        assert!(dup_s_type.is_err());
    }

    #[test]
    fn test_head_cannot_be_an_extension() {
        let err = parse(quote! {
            #[extension(vk::KHR_SWAPCHAIN_NAME)]
            head Core = vk::PhysicalDeviceFeatures [PHYSICAL_DEVICE_FEATURES_2] { wide_lines }
        });
        assert!(err.is_err());
    }
}
