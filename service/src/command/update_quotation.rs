//! [`Command`] for editing a [`Quotation`] while it's still pending.

use std::collections::HashMap;

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        catalog,
        pricing::{Count, PropertyType, SquareFootage},
        quotation::{
            self, Contact, Frequency, Requestor, Selection, Zipcode,
        },
        user, Quotation,
    },
    infra::{database, Database},
    Service,
};

use super::{estimate_quotation, Command, EstimateQuotation};

/// [`Command`] for editing a [`Quotation`] while it's still pending.
///
/// Re-estimates the [`Quotation`] after the [`Patch`] is applied.
///
/// A guest's [`Quotation`] may be edited by anyone knowing its ID, while a
/// customer's one only by that customer.
#[derive(Clone, Debug)]
pub struct UpdateQuotation {
    /// ID of the [`Quotation`] to edit.
    pub id: quotation::Id,

    /// ID of the authenticated [`user::User`] editing, if any.
    pub editor_id: Option<user::Id>,

    /// Changes to apply.
    pub patch: Patch,
}

/// Changes to a [`Quotation`].
///
/// [`None`] leaves a field untouched, `Some(None)` clears an optional one.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// New [`Selection`].
    pub selection: Option<Selection>,

    /// New [`PropertyType`].
    pub property_type: Option<Option<PropertyType>>,

    /// New number of bedrooms.
    pub bedrooms: Option<Count>,

    /// New number of bathrooms.
    pub bathrooms: Option<Count>,

    /// New [`SquareFootage`] band.
    pub square_footage: Option<Option<SquareFootage>>,

    /// New number of laundry loads.
    pub laundry_loads: Option<Count>,

    /// New [`Zipcode`].
    pub zipcode: Option<Zipcode>,

    /// New street address.
    pub address: Option<Option<String>>,

    /// New city.
    pub city: Option<Option<String>>,

    /// New [`Frequency`].
    pub frequency: Option<Option<Frequency>>,

    /// New special requirements.
    pub special_requirements: Option<Option<String>>,

    /// New preferred [`Date`].
    pub preferred_date: Option<Option<Date>>,

    /// New preferred time of day.
    pub preferred_time: Option<Option<String>>,

    /// New name of the guest requestor.
    pub guest_name: Option<user::Name>,

    /// New [`Contact`] of the guest requestor.
    pub guest_contact: Option<Contact>,
}

impl Patch {
    /// Applies this [`Patch`] to the provided [`Quotation`].
    ///
    /// # Errors
    ///
    /// If guest details are patched on a [`Quotation`] of a customer.
    pub fn apply_to(self, q: &mut Quotation) -> Result<(), NotGuest> {
        let Self {
            selection,
            property_type,
            bedrooms,
            bathrooms,
            square_footage,
            laundry_loads,
            zipcode,
            address,
            city,
            frequency,
            special_requirements,
            preferred_date,
            preferred_time,
            guest_name,
            guest_contact,
        } = self;

        if guest_name.is_some() || guest_contact.is_some() {
            let Requestor::Guest(guest) = &mut q.requestor else {
                return Err(NotGuest);
            };
            if let Some(name) = guest_name {
                guest.name = name;
            }
            if let Some(contact) = guest_contact {
                guest.contact = contact;
            }
        }

        fn set<T>(field: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *field = v;
            }
        }

        set(&mut q.selection, selection);
        set(&mut q.attributes.property_type, property_type);
        set(&mut q.attributes.bedrooms, bedrooms);
        set(&mut q.attributes.bathrooms, bathrooms);
        set(&mut q.attributes.square_footage, square_footage);
        set(&mut q.attributes.laundry_loads, laundry_loads);
        set(&mut q.location.zipcode, zipcode);
        set(&mut q.location.address, address);
        set(&mut q.location.city, city);
        set(&mut q.frequency, frequency);
        set(&mut q.special_requirements, special_requirements);
        set(&mut q.preferred_date, preferred_date);
        set(&mut q.preferred_time, preferred_time);

        Ok(())
    }
}

/// Error of patching guest details of a customer's [`Quotation`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Quotation` is not requested by a guest")]
pub struct NotGuest;

impl<Db> Command<UpdateQuotation> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<catalog::Id, catalog::Entry>, Vec<catalog::Id>>>,
            Ok = HashMap<catalog::Id, catalog::Entry>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Quotation, quotation::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Quotation>, quotation::Id>>,
            Ok = Option<Quotation>,
            Err = Traced<database::Error>,
        > + Database<Update<Quotation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Quotation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateQuotation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateQuotation {
            id,
            editor_id,
            patch,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut quotation = tx
            .execute(Select(By::<Option<Quotation>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|q| match q.requestor {
                Requestor::Customer(owner) => editor_id == Some(owner),
                Requestor::Guest(_) => true,
            })
            .ok_or(E::QuotationNotExists(id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        quotation
            .ensure_pending(now)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        patch
            .apply_to(&mut quotation)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let estimate_quotation::Output { estimate, .. } = self
            .execute(EstimateQuotation {
                selection: quotation.selection.clone(),
                attributes: quotation.attributes.clone(),
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        quotation.estimated_duration = estimate.duration;
        quotation.estimated_price = estimate.price;
        quotation.updated_at = now.coerce();

        tx.execute(Update(quotation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(quotation)
    }
}

/// Error of [`UpdateQuotation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Re-estimating the [`Quotation`] failed.
    #[display("Failed to estimate `Quotation`: {_0}")]
    Estimation(estimate_quotation::ExecutionError),

    /// Guest details are patched on a customer's [`Quotation`].
    #[display("{_0}")]
    NotGuest(NotGuest),

    /// [`Quotation`] with the provided ID does not exist or belongs to
    /// another customer.
    #[display("`Quotation(id: {_0})` does not exist")]
    #[from(ignore)]
    QuotationNotExists(#[error(not(source))] quotation::Id),

    /// [`Quotation`] cannot be edited anymore.
    #[display("{_0}")]
    Transition(quotation::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::{Date, DateTime};

    use crate::domain::{
        pricing::{Count, PropertyType},
        quotation::{fixture, Contact, Requestor},
        user,
    };

    use super::{NotGuest, Patch};

    #[test]
    fn touches_only_patched_fields() {
        let mut q = fixture::pending(DateTime::now());
        let before = q.clone();

        Patch {
            bedrooms: Some(Count::new(3).unwrap()),
            property_type: Some(Some(PropertyType::House)),
            preferred_date: Some(Date::parse("2025-07-01").ok()),
            special_requirements: Some(None),
            ..Patch::default()
        }
        .apply_to(&mut q)
        .unwrap();

        assert_eq!(q.attributes.bedrooms, Count::new(3).unwrap());
        assert_eq!(q.attributes.property_type, Some(PropertyType::House));
        assert!(q.preferred_date.is_some());
        assert_eq!(q.attributes.bathrooms, before.attributes.bathrooms);
        assert_eq!(q.location, before.location);
        assert_eq!(q.requestor, before.requestor);
    }

    #[test]
    fn updates_guest_details() {
        let mut q = fixture::pending(DateTime::now());

        Patch {
            guest_contact: Contact::classify("+1 (212) 555-0100"),
            ..Patch::default()
        }
        .apply_to(&mut q)
        .unwrap();

        let Requestor::Guest(guest) = &q.requestor else {
            panic!("requestor changed: {:?}", q.requestor);
        };
        assert!(guest.contact.phone().is_some());
    }

    #[test]
    fn rejects_guest_details_of_customer() {
        let mut q = fixture::pending(DateTime::now());
        q.requestor = Requestor::Customer(user::Id::new());

        let res = Patch {
            guest_name: user::Name::new("Bob"),
            ..Patch::default()
        }
        .apply_to(&mut q);

        assert!(matches!(res, Err(NotGuest)));
    }
}
