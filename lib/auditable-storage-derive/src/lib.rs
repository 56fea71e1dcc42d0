use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// How one struct field maps onto columns.
enum FieldKind {
    Column(String),
    Flatten,
    Skip,
}

/// Parse `#[column(name = "...")]`, `#[column(flatten)]` and `#[column(skip)]`.
fn field_kind(field: &syn::Field) -> syn::Result<FieldKind> {
    let mut name = None;
    let mut flatten = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("flatten") {
                flatten = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`, `flatten` or `skip`"))
            }
        })?;
    }

    let set = [name.is_some(), flatten, skip]
        .iter()
        .filter(|b| **b)
        .count();
    if set > 1 {
        return Err(syn::Error::new_spanned(
            field,
            "`name`, `flatten` and `skip` are mutually exclusive",
        ));
    }

    if skip {
        return Ok(FieldKind::Skip);
    }
    if flatten {
        return Ok(FieldKind::Flatten);
    }
    match (name, &field.ident) {
        (Some(name), _) => Ok(FieldKind::Column(name)),
        (None, Some(ident)) => Ok(FieldKind::Column(
            ident.to_string().trim_start_matches("r#").to_string(),
        )),
        (None, None) => Err(syn::Error::new_spanned(field, "unnamed field")),
    }
}

/// Derive `auditable_storage::Record`.
///
/// Every named field becomes a column named after the field unless annotated:
///
/// - `#[column(name = "display_name")]` stores the field under another name
/// - `#[column(flatten)]` inlines the columns of a nested `Record`
/// - `#[column(skip)]` leaves the field out; it is rebuilt with `Default`
///
/// Column field types must convert into `Value` and implement `FromValue`.
#[proc_macro_derive(Record, attributes(column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut column_names = Vec::new();
    let mut to_columns = Vec::new();
    let mut from_row = Vec::new();

    for field in fields {
        let ident = &field.ident;
        let ty = &field.ty;

        match field_kind(field)? {
            FieldKind::Column(column) => {
                column_names.push(quote! { columns.push(#column); });
                to_columns.push(quote! {
                    values.push((
                        #column,
                        ::auditable_storage::Value::from(::core::clone::Clone::clone(&self.#ident)),
                    ));
                });
                from_row.push(quote! {
                    #ident: row.get::<#ty>(#column)?
                });
            }
            FieldKind::Flatten => {
                column_names.push(quote! {
                    columns.extend(<#ty as ::auditable_storage::Record>::columns());
                });
                to_columns.push(quote! {
                    values.extend(::auditable_storage::Record::to_columns(&self.#ident));
                });
                from_row.push(quote! {
                    #ident: <#ty as ::auditable_storage::Record>::from_row(row)?
                });
            }
            FieldKind::Skip => {
                from_row.push(quote! {
                    #ident: ::core::default::Default::default()
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::auditable_storage::Record for #name #ty_generics #where_clause {
            fn columns() -> ::std::vec::Vec<&'static str> {
                let mut columns = ::std::vec::Vec::new();
                #(#column_names)*
                columns
            }

            fn to_columns(&self) -> ::std::vec::Vec<(&'static str, ::auditable_storage::Value)> {
                let mut values = ::std::vec::Vec::new();
                #(#to_columns)*
                values
            }

            fn from_row(
                row: &::auditable_storage::Row,
            ) -> ::std::result::Result<Self, ::auditable_storage::StorageError> {
                ::std::result::Result::Ok(Self {
                    #(#from_row),*
                })
            }
        }
    })
}
