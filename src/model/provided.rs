use super::{DetachableModel, EntityModel, ModelState};
use crate::core::{Result, Value};
use crate::session::UnitOfWorkProvider;

/// An [`EntityModel`] paired with the provider of the request's unit of work,
/// for hosts that call get/set/detach without passing a session.
pub struct ProvidedModel<P: UnitOfWorkProvider> {
    model: EntityModel,
    provider: P,
}

impl<P: UnitOfWorkProvider> ProvidedModel<P> {
    pub fn new(model: EntityModel, provider: P) -> Self {
        Self { model, provider }
    }

    pub fn state(&self) -> ModelState {
        self.model.state()
    }

    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut EntityModel {
        &mut self.model
    }

    pub fn into_inner(self) -> EntityModel {
        self.model
    }
}

impl<P: UnitOfWorkProvider> DetachableModel for ProvidedModel<P> {
    fn object(&mut self) -> Result<Value> {
        let uow = self.provider.current()?;
        self.model.object(uow.as_ref())
    }

    fn set_object(&mut self, object: Value) {
        self.model.set_object(object);
    }

    fn detach(&mut self) -> Result<()> {
        if self.model.state() != ModelState::Live {
            return Ok(());
        }
        let uow = self.provider.current()?;
        self.model.detach(uow.as_ref())
    }
}
