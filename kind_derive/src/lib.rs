use inflector::Inflector;
use proc_macro::TokenStream;
use quote::quote;
use syn::*;

/// Derives `Display` for a fieldless enum, printing each variant as its
/// snake_case name (`Sdiv` => `sdiv`). `#[style("...")]` overrides the text
/// of a single variant.
#[proc_macro_derive(LlvmDisplay, attributes(style))]
pub fn llvm_display_derive(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	let name = input.ident;
	let Data::Enum(DataEnum { variants, .. }) = input.data else {
		return Error::new(name.span(), "LlvmDisplay is only defined for enums")
			.to_compile_error()
			.into();
	};

	let cases = variants.into_iter().map(|v| {
		let variant_name = &v.ident;
		if !matches!(v.fields, Fields::Unit) {
			return Error::new_spanned(&v, "LlvmDisplay variants cannot carry data")
				.to_compile_error();
		}
		for attr in &v.attrs {
			if attr.path().is_ident("style") {
				return match attr.parse_args::<LitStr>() {
					Ok(lit_str) => {
						let val = lit_str.value();
						quote! {
							#name::#variant_name => write!(f, "{}", #val)
						}
					}
					Err(_) => Error::new_spanned(attr, "Expected a string literal")
						.to_compile_error(),
				};
			}
		}
		let variant_str = variant_name.to_string().to_snake_case();
		quote! {
			#name::#variant_name => write!(f, "{}", #variant_str)
		}
	});

	let expanded = quote! {
		impl std::fmt::Display for #name {
			fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
				match self {
					#( #cases, )*
				}
			}
		}
	};

	TokenStream::from(expanded)
}
