//! Implementation of the standalone `#[laptime::time]` attribute macro.
//!
//! On its own the attribute rewrites the one function it is placed on. It
//! has no view of the enclosing type, so no companion is generated.

use laptime_engine::{EngineConfig, EngineError, MarkerConfig};
use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{parse2, Error, ItemFn, Result, TraitItemFn};

use crate::probes;

/// Main entry point for the time attribute macro.
pub fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream> {
    let config = MarkerConfig::from_args(attr)?;

    let mut function: ItemFn = match parse2(item.clone()) {
        Ok(function) => function,
        Err(err) => {
            // A trait method without a default body has nothing to time.
            return match parse2::<TraitItemFn>(item) {
                Ok(declaration) if declaration.default.is_none() => {
                    Ok(declaration.into_token_stream())
                }
                _ => Err(err),
            };
        }
    };

    if function.sig.constness.is_some() {
        let err = EngineError::ConstFn(function.sig.ident.to_string());
        return Err(Error::new_spanned(&function.sig.constness, err));
    }

    let mut engine = probes::engine(EngineConfig::default(), 1);
    let outcome = engine.instrument(&mut function.block, &config);
    probes::finish(&engine);
    outcome.map_err(|err| Error::new(Span::call_site(), err))?;

    Ok(quote!(#function))
}
