//! Construction of concrete generic method contexts.

use std::sync::Arc;

use crate::{
    binary::GenericMethodRef,
    context::{
        application::ApplicationContext,
        members::{ConcreteGenericMethod, MethodContext, MethodContextRc, ParameterContext},
    },
    Error, Result,
};

impl MethodContext {
    /// Build the context of one generic method instantiation.
    ///
    /// The declaring assembly, declaring type and base method are resolved from `reference`;
    /// the declaring type becomes a generic instance when the reference carries type
    /// arguments. Parameters whose type does not change under instantiation share the base
    /// method's parameter context, all others are injected copies. Code bytes are fetched
    /// only if the reference points at generated code and the options ask for it.
    ///
    /// # Errors
    /// Returns [`Error::AssemblyNotFound`], [`Error::TypeNotFound`] or
    /// [`Error::MethodNotFound`] for unresolvable references, any instantiation error, and
    /// [`Error::CodeFetch`] if the code pointer does not map into the image.
    pub fn concrete_generic(
        app: &Arc<ApplicationContext>,
        reference: &GenericMethodRef,
    ) -> Result<MethodContextRc> {
        let assembly = app
            .get_assembly_by_name(&reference.declaring_assembly)
            .ok_or_else(|| Error::AssemblyNotFound(reference.declaring_assembly.clone()))?;

        let definition = assembly
            .get_type_by_definition_index(reference.declaring_type)
            .ok_or_else(|| {
                Error::TypeNotFound(format!(
                    "type definition {} in {}",
                    reference.declaring_type, reference.declaring_assembly
                ))
            })?;

        let base = definition
            .get_method_by_index(reference.base_method)
            .ok_or_else(|| {
                Error::MethodNotFound(format!(
                    "{}::{}",
                    definition.full_name(),
                    reference.base_method_name
                ))
            })?;

        let type_args = assembly.resolve_type_array(&reference.type_generic_params)?;
        let method_args = assembly.resolve_type_array(&reference.method_generic_params)?;

        let declaring_type = if type_args.is_empty() {
            definition.clone()
        } else {
            app.interner
                .generic_instance(&definition, type_args.clone(), &assembly)
        };

        let parameters = base
            .parameters()
            .iter()
            .map(|parameter| {
                let original = parameter.parameter_type()?;
                let instantiated =
                    app.interner
                        .instantiate(&original, &type_args, &method_args, &assembly)?;
                Ok(if Arc::ptr_eq(&original, &instantiated) {
                    parameter.clone()
                } else {
                    Arc::new(ParameterContext::injected(parameter, &instantiated))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let return_type =
            app.interner
                .instantiate(&base.return_type()?, &type_args, &method_args, &assembly)?;

        let method = MethodContext::instantiated(
            &declaring_type,
            ConcreteGenericMethod {
                base,
                reference: reference.clone(),
                declaring_assembly: Arc::downgrade(&assembly),
                type_args,
                method_args,
            },
            parameters,
            &return_type,
        );

        if method.underlying_pointer() != 0 && app.options().fetch_method_bytes {
            let bytes = app.instruction_set().raw_bytes_for_method(&method, false)?;
            let _ = method.raw_bytes.set(bytes);
        }

        Ok(Arc::new(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::LoadOptions,
        metadata::{MetadataVersion, MethodAttributes},
        test::MetadataBuilder,
    };

    /// `Game.Util.Echo<T>(T value)` and the single reference instantiating it with `int`
    fn echo_app() -> (Arc<ApplicationContext>, GenericMethodRef) {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.1));
        let corlib = builder.corlib();
        let game = builder.assembly("Game", "Game.dll");
        let util = builder.type_def(game, "Game", "Util");
        builder.set_parent(util, corlib.object);
        let (container, parameters) = builder.method_generic_parameters(&["T"]);
        let t = builder.generic_parameter_type(parameters[0]);
        let flags = (MethodAttributes::PUBLIC | MethodAttributes::STATIC).bits();
        let echo = builder.method_full(util, "Echo", t, &[("value", t)], flags, container);
        let address = builder.code_block(&[0x90, 0xC3]);
        builder.method_spec(echo, &[], &[corlib.int32], address);

        let app = builder.build_context(LoadOptions::minimal()).unwrap();
        let mut references = GenericMethodRef::collect(app.registration(), app.metadata()).unwrap();
        assert_eq!(references.len(), 1);
        (app, references.remove(0))
    }

    #[test]
    fn test_concrete_generic_resolves() {
        let (app, reference) = echo_app();
        let method = MethodContext::concrete_generic(&app, &reference).unwrap();

        assert_eq!(method.name(), "Echo");
        assert!(method.parameters()[0].is_injected());
        assert_eq!(method.raw_bytes().unwrap(), &[0x90, 0xC3]);
    }

    #[test]
    fn test_concrete_generic_unknown_assembly() {
        let (app, mut reference) = echo_app();
        reference.declaring_assembly = "Plugins".to_string();

        assert!(matches!(
            MethodContext::concrete_generic(&app, &reference),
            Err(Error::AssemblyNotFound(name)) if name == "Plugins"
        ));
    }

    #[test]
    fn test_concrete_generic_unknown_type() {
        let (app, mut reference) = echo_app();
        reference.declaring_type = 10_000;

        assert!(matches!(
            MethodContext::concrete_generic(&app, &reference),
            Err(Error::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_concrete_generic_unknown_base_method() {
        let (app, mut reference) = echo_app();
        reference.base_method += 1;

        match MethodContext::concrete_generic(&app, &reference) {
            Err(Error::MethodNotFound(name)) => assert_eq!(name, "Game.Util::Echo"),
            other => panic!("expected MethodNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_concrete_generic_missing_argument() {
        let (app, mut reference) = echo_app();
        reference.method_generic_params.clear();

        assert!(matches!(
            MethodContext::concrete_generic(&app, &reference),
            Err(Error::GenericOrdinalOutOfRange { ordinal: 0, count: 0 })
        ));
    }
}
