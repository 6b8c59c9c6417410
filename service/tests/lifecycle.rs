//! Quotation and booking lifecycles over an in-memory [`Database`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use common::{
    money::Currency,
    operations::{By, Commit, Insert, Lock, Select, Transact, Update},
    DateTime, Minutes, Money, Percent,
};
use rust_decimal::Decimal;
use service::{
    command::{
        self, cancel_booking, create_booking, reject_quotation,
        update_booking_status, update_maid_rate, update_quotation,
        update_user_profile,
    },
    domain::{
        booking, catalog, pricing,
        quotation::{self, Contact, Guest, Location, Requestor, Selection},
        user, Booking, Quotation, User,
    },
    infra::{database, Database},
    read, Command as _, Config, Service,
};
use tracerr::Traced;

#[derive(Debug, Default)]
struct State {
    users: HashMap<user::Id, User>,
    quotations: HashMap<quotation::Id, Quotation>,
    bookings: HashMap<booking::Id, Booking>,
}

#[derive(Clone, Debug, Default)]
struct Memory(Arc<Mutex<State>>);

impl Memory {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }
}

type Result<T> = std::result::Result<T, Traced<database::Error>>;

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<()> {
        Ok(())
    }
}

impl
    Database<
        Select<By<HashMap<catalog::Id, catalog::Entry>, Vec<catalog::Id>>>,
    > for Memory
{
    type Ok = HashMap<catalog::Id, catalog::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<HashMap<catalog::Id, catalog::Entry>, Vec<catalog::Id>>>,
    ) -> Result<Self::Ok> {
        Ok(HashMap::new())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().users.get(&by.into_inner()).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok> {
        let email = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }
}

impl Database<Lock<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<User, user::Id>>) -> Result<()> {
        Ok(())
    }
}

impl Database<Update<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(u): Update<User>) -> Result<()> {
        _ = self.state().users.insert(u.id, u);
        Ok(())
    }
}

impl Database<Insert<Quotation>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(q): Insert<Quotation>) -> Result<()> {
        _ = self.state().quotations.insert(q.id, q);
        Ok(())
    }
}

impl Database<Update<Quotation>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(q): Update<Quotation>) -> Result<()> {
        _ = self.state().quotations.insert(q.id, q);
        Ok(())
    }
}

impl Database<Lock<By<Quotation, quotation::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<Quotation, quotation::Id>>) -> Result<()> {
        Ok(())
    }
}

impl Database<Select<By<Option<Quotation>, quotation::Id>>> for Memory {
    type Ok = Option<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Quotation>, quotation::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().quotations.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Quotation>, read::quotation::OwnedBy>>>
    for Memory
{
    type Ok = Option<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Quotation>, read::quotation::OwnedBy>>,
    ) -> Result<Self::Ok> {
        let read::quotation::OwnedBy { id, owner_id } = by.into_inner();
        Ok(self
            .state()
            .quotations
            .get(&id)
            .filter(|q| q.is_owned_by(owner_id))
            .cloned())
    }
}

impl Database<Insert<Booking>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(b): Insert<Booking>) -> Result<()> {
        _ = self.state().bookings.insert(b.id, b);
        Ok(())
    }
}

impl Database<Update<Booking>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(b): Update<Booking>) -> Result<()> {
        _ = self.state().bookings.insert(b.id, b);
        Ok(())
    }
}

impl Database<Lock<By<Booking, booking::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<Booking, booking::Id>>) -> Result<()> {
        Ok(())
    }
}

impl Database<Select<By<Option<Booking>, read::booking::Involving>>>
    for Memory
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, read::booking::Involving>>,
    ) -> Result<Self::Ok> {
        let read::booking::Involving { id, user_id } = by.into_inner();
        Ok(self
            .state()
            .bookings
            .get(&id)
            .filter(|b| b.party_of(user_id).is_some())
            .cloned())
    }
}

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn service() -> Service<Memory> {
    let secret = b"lifecycle";
    Service::new(
        Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            session_ttl: Duration::from_secs(60 * 60),
            quotation_validity: WEEK,
            pricing: pricing::Policy::default(),
            vat: Percent::new(Decimal::from(7)).unwrap(),
            platform_fee: Percent::new(Decimal::from(15)).unwrap(),
            booking_policy: booking::Policy::Party,
        },
        Memory::default(),
    )
}

fn usd(cents: i64) -> Money {
    Money {
        amount: Decimal::new(cents, 2),
        currency: Currency::Usd,
    }
}

fn register(service: &Service<Memory>, role: user::Role) -> user::Id {
    let id = user::Id::new();
    let password = user::Password::new("secret1").unwrap();
    let user = User {
        id,
        name: user::Name::new("Jane Doe").unwrap(),
        email: user::Email::new(format!("{id}@example.com")).unwrap(),
        password_hash: user::PasswordHash::new(id, &password),
        phone: None,
        role,
        hourly_rate: (role == user::Role::Maid).then(|| usd(2500)),
        created_at: DateTime::now().coerce(),
        deleted_at: None,
    };
    _ = service.database().state().users.insert(id, user);
    id
}

fn quotation_of(requestor: Requestor) -> command::CreateQuotation {
    command::CreateQuotation {
        requestor,
        selection: Selection::Legacy(pricing::ServiceType::GeneralCleaning),
        attributes: pricing::Attributes::default(),
        location: Location {
            zipcode: quotation::Zipcode::new("10001").unwrap(),
            address: None,
            city: Some("New York".into()),
        },
        frequency: Some(quotation::Frequency::Weekly),
        special_requirements: None,
        preferred_date: None,
        preferred_time: None,
    }
}

fn guest() -> Requestor {
    Requestor::Guest(Guest {
        name: user::Name::new("Jane").unwrap(),
        contact: Contact::classify("jane@example.com").unwrap(),
    })
}

fn deep_cleaning_of_house() -> update_quotation::Patch {
    update_quotation::Patch {
        selection: Some(Selection::Legacy(pricing::ServiceType::DeepCleaning)),
        property_type: Some(Some(pricing::PropertyType::House)),
        bedrooms: pricing::Count::new(3),
        bathrooms: pricing::Count::new(2),
        ..update_quotation::Patch::default()
    }
}

fn booking_of(
    client_id: user::Id,
    provider_id: user::Id,
    quotation_id: Option<quotation::Id>,
) -> command::CreateBooking {
    command::CreateBooking {
        client_id,
        provider_id,
        quotation_id,
        start_time: booking::StartDateTime::from_rfc3339(
            "2030-01-07T09:00:00Z",
        )
        .unwrap(),
        end_time: None,
        duration: Some(Minutes::new(90)),
        special_instructions: None,
        is_recurring: false,
        recurrence_pattern: None,
    }
}

#[tokio::test]
async fn places_pending_quotation_valid_for_a_week() {
    let service = service();

    let q = service
        .execute(quotation_of(guest()))
        .await
        .unwrap();

    assert_eq!(q.status, quotation::Status::Pending);
    assert_eq!(q.valid_until.since(q.created_at), Some(WEEK));
    assert_eq!(q.estimated_duration, Minutes::new(225));
    assert!(q.estimated_price.is_some());
    assert!(service.database().state().quotations.contains_key(&q.id));
}

#[tokio::test]
async fn rejects_quotation_only_once() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let q = service
        .execute(quotation_of(Requestor::Customer(client)))
        .await
        .unwrap();

    let rejected = service
        .execute(command::RejectQuotation {
            quotation_id: q.id,
            customer_id: client,
        })
        .await
        .unwrap();
    let err = service
        .execute(command::RejectQuotation {
            quotation_id: q.id,
            customer_id: client,
        })
        .await
        .unwrap_err();

    assert_eq!(rejected.status, quotation::Status::Rejected);
    assert!(matches!(
        err.as_ref(),
        reject_quotation::ExecutionError::Transition(
            quotation::TransitionError::NotPending(quotation::Status::Rejected),
        ),
    ));
    let stored = service.database().state().quotations[&q.id].clone();
    assert_eq!(stored.updated_at, rejected.updated_at);
}

#[tokio::test]
async fn hides_quotations_of_other_customers() {
    let service = service();
    let owner = register(&service, user::Role::Client);
    let stranger = register(&service, user::Role::Client);
    let q = service
        .execute(quotation_of(Requestor::Customer(owner)))
        .await
        .unwrap();

    let err = service
        .execute(command::RejectQuotation {
            quotation_id: q.id,
            customer_id: stranger,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        reject_quotation::ExecutionError::QuotationNotExists(id) if *id == q.id,
    ));
    let stored = service.database().state().quotations[&q.id].clone();
    assert_eq!(stored.status, quotation::Status::Pending);
}

#[tokio::test]
async fn re_estimates_patched_guest_quotation() {
    let service = service();
    let q = service.execute(quotation_of(guest())).await.unwrap();

    let patched = service
        .execute(command::UpdateQuotation {
            id: q.id,
            editor_id: None,
            patch: deep_cleaning_of_house(),
        })
        .await
        .unwrap();

    assert_eq!(patched.status, quotation::Status::Pending);
    assert_eq!(patched.estimated_duration, Minutes::new(330));
    assert_eq!(patched.estimated_price, Some(usd(29700)));
    assert_eq!(patched.location, q.location);
    assert_eq!(patched.frequency, q.frequency);
    let stored = service.database().state().quotations[&q.id].clone();
    assert_eq!(stored.estimated_price, Some(usd(29700)));
}

#[tokio::test]
async fn lets_only_owner_patch_customer_quotation() {
    let service = service();
    let owner = register(&service, user::Role::Client);
    let stranger = register(&service, user::Role::Client);
    let q = service
        .execute(quotation_of(Requestor::Customer(owner)))
        .await
        .unwrap();

    for editor_id in [None, Some(stranger)] {
        let err = service
            .execute(command::UpdateQuotation {
                id: q.id,
                editor_id,
                patch: deep_cleaning_of_house(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            update_quotation::ExecutionError::QuotationNotExists(id)
                if *id == q.id,
        ));
    }
    let stored = service.database().state().quotations[&q.id].clone();
    assert_eq!(stored.estimated_duration, Minutes::new(225));

    let patched = service
        .execute(command::UpdateQuotation {
            id: q.id,
            editor_id: Some(owner),
            patch: deep_cleaning_of_house(),
        })
        .await
        .unwrap();

    assert_eq!(patched.estimated_duration, Minutes::new(330));
    assert_eq!(patched.requestor, Requestor::Customer(owner));
}

#[tokio::test]
async fn refuses_patch_of_decided_quotation() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let accepted = service
        .execute(quotation_of(Requestor::Customer(client)))
        .await
        .unwrap();
    let rejected = service
        .execute(quotation_of(Requestor::Customer(client)))
        .await
        .unwrap();
    _ = service
        .execute(command::AcceptQuotation {
            quotation_id: accepted.id,
            customer_id: client,
            provider_id: maid,
        })
        .await
        .unwrap();
    _ = service
        .execute(command::RejectQuotation {
            quotation_id: rejected.id,
            customer_id: client,
        })
        .await
        .unwrap();

    for (id, status) in [
        (accepted.id, quotation::Status::Accepted),
        (rejected.id, quotation::Status::Rejected),
    ] {
        let before = service.database().state().quotations[&id].clone();
        let err = service
            .execute(command::UpdateQuotation {
                id,
                editor_id: Some(client),
                patch: deep_cleaning_of_house(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            update_quotation::ExecutionError::Transition(
                quotation::TransitionError::NotPending(s),
            ) if *s == status,
        ));
        let stored = service.database().state().quotations[&id].clone();
        assert_eq!(stored.updated_at, before.updated_at);
        assert_eq!(stored.estimated_price, before.estimated_price);
    }
}

#[tokio::test]
async fn refuses_patch_of_expired_quotation() {
    let service = service();
    let q = service.execute(quotation_of(guest())).await.unwrap();
    let expired_at = DateTime::now() - Duration::from_secs(60);
    service
        .database()
        .state()
        .quotations
        .get_mut(&q.id)
        .unwrap()
        .valid_until = expired_at.coerce();

    let err = service
        .execute(command::UpdateQuotation {
            id: q.id,
            editor_id: None,
            patch: deep_cleaning_of_house(),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        update_quotation::ExecutionError::Transition(
            quotation::TransitionError::Expired(_),
        ),
    ));
    let stored = service.database().state().quotations[&q.id].clone();
    assert_eq!(stored.status, quotation::Status::Pending);
    assert_eq!(stored.estimated_duration, Minutes::new(225));
}

#[tokio::test]
async fn books_accepted_quotation() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let q = service
        .execute(quotation_of(Requestor::Customer(client)))
        .await
        .unwrap();
    let accepted = service
        .execute(command::AcceptQuotation {
            quotation_id: q.id,
            customer_id: client,
            provider_id: maid,
        })
        .await
        .unwrap();

    let b = service
        .execute(booking_of(client, maid, Some(q.id)))
        .await
        .unwrap();

    assert_eq!(accepted.status, quotation::Status::Accepted);
    assert_eq!(accepted.provider_id, Some(maid));
    assert_eq!(b.status, booking::Status::Pending);
    assert_eq!(b.schedule.duration, Minutes::new(90));
    assert_eq!(b.financials.total_amount, usd(3750));
    assert_eq!(b.financials.platform_fee, usd(563));
    assert_eq!(b.financials.provider_earnings, usd(3187));
}

#[tokio::test]
async fn charges_new_rate_on_later_bookings() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let before = service
        .execute(booking_of(client, maid, None))
        .await
        .unwrap();

    let updated = service
        .execute(command::UpdateMaidRate {
            user_id: maid,
            hourly_rate: usd(3000),
        })
        .await
        .unwrap();
    let after = service
        .execute(booking_of(client, maid, None))
        .await
        .unwrap();

    assert_eq!(updated.hourly_rate, Some(usd(3000)));
    assert_eq!(before.financials.total_amount, usd(3750));
    assert_eq!(after.financials.total_amount, usd(4500));
    assert_eq!(after.financials.platform_fee, usd(675));
    assert_eq!(after.financials.provider_earnings, usd(3825));
    let stored = service.database().state().bookings[&before.id].clone();
    assert_eq!(stored.financials.total_amount, usd(3750));
}

#[tokio::test]
async fn refuses_rate_of_non_maids_and_non_positive_rates() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);

    let not_maid = service
        .execute(command::UpdateMaidRate {
            user_id: client,
            hourly_rate: usd(3000),
        })
        .await
        .unwrap_err();
    let zero = service
        .execute(command::UpdateMaidRate {
            user_id: maid,
            hourly_rate: usd(0),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        not_maid.as_ref(),
        update_maid_rate::ExecutionError::Rate(user::RateError::NotMaid(
            user::Role::Client,
        )),
    ));
    assert!(matches!(
        zero.as_ref(),
        update_maid_rate::ExecutionError::Rate(
            user::RateError::NonPositive(_),
        ),
    ));
    let state = service.database().state();
    assert_eq!(state.users[&client].hourly_rate, None);
    assert_eq!(state.users[&maid].hourly_rate, Some(usd(2500)));
}

#[tokio::test]
async fn updates_profile_details() {
    let service = service();
    let client = register(&service, user::Role::Client);

    let updated = service
        .execute(command::UpdateUserProfile {
            user_id: client,
            name: user::Name::new("Jane Roe"),
            phone: Some(user::Phone::new("+1 555 010 0200")),
            ..command::UpdateUserProfile::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.name, user::Name::new("Jane Roe").unwrap());
    assert_eq!(updated.phone, user::Phone::new("+1 555 010 0200"));
    assert_eq!(
        updated.email,
        user::Email::new(format!("{client}@example.com")).unwrap(),
    );
    assert_eq!(service.database().state().users[&client].name, updated.name);
}

#[tokio::test]
async fn refuses_occupied_email() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let other = register(&service, user::Role::Maid);
    let taken = user::Email::new(format!("{other}@example.com")).unwrap();

    let err = service
        .execute(command::UpdateUserProfile {
            user_id: client,
            email: Some(taken.clone()),
            ..command::UpdateUserProfile::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        update_user_profile::ExecutionError::EmailOccupied(e) if *e == taken,
    ));
    assert_ne!(service.database().state().users[&client].email, taken);
}

#[tokio::test]
async fn refuses_profile_of_deleted_user() {
    let service = service();
    let client = register(&service, user::Role::Client);
    service.database().state().users.get_mut(&client).unwrap().deleted_at =
        Some(DateTime::now().coerce());

    let err = service
        .execute(command::UpdateUserProfile {
            user_id: client,
            name: user::Name::new("Jane Roe"),
            ..command::UpdateUserProfile::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        update_user_profile::ExecutionError::UserNotExists(id) if *id == client,
    ));
}

#[tokio::test]
async fn refuses_booking_of_undecided_quotation() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let q = service
        .execute(quotation_of(Requestor::Customer(client)))
        .await
        .unwrap();

    let err = service
        .execute(booking_of(client, maid, Some(q.id)))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        create_booking::ExecutionError::QuotationNotAccepted(
            quotation::Status::Pending,
        ),
    ));
    assert!(service.database().state().bookings.is_empty());
}

#[tokio::test]
async fn refuses_booking_a_client_as_maid() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let other = register(&service, user::Role::Client);

    let err = service
        .execute(booking_of(client, other, None))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        create_booking::ExecutionError::NotProvider(id) if *id == other,
    ));
}

#[tokio::test]
async fn cancels_booking_only_once() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let b = service.execute(booking_of(client, maid, None)).await.unwrap();

    let confirmed = service
        .execute(command::UpdateBookingStatus {
            booking_id: b.id,
            actor_id: maid,
            status: booking::Status::Confirmed,
        })
        .await
        .unwrap();
    let cancelled = service
        .execute(command::CancelBooking {
            booking_id: b.id,
            actor_id: client,
            reason: booking::CancellationReason::new("Feeling sick").unwrap(),
        })
        .await
        .unwrap();
    let err = service
        .execute(command::CancelBooking {
            booking_id: b.id,
            actor_id: client,
            reason: booking::CancellationReason::new("Again").unwrap(),
        })
        .await
        .unwrap_err();

    assert_eq!(confirmed.status, booking::Status::Confirmed);
    assert_eq!(cancelled.status, booking::Status::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(
        cancelled.cancellation_reason.as_ref().map(ToString::to_string),
        Some("Feeling sick".to_owned()),
    );
    assert!(matches!(
        err.as_ref(),
        cancel_booking::ExecutionError::Transition(
            booking::TransitionError::NotAllowed {
                from: booking::Status::Cancelled,
                to: booking::Status::Cancelled,
            },
        ),
    ));
}

#[tokio::test]
async fn requires_reason_to_cancel() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let b = service.execute(booking_of(client, maid, None)).await.unwrap();

    let err = service
        .execute(command::UpdateBookingStatus {
            booking_id: b.id,
            actor_id: client,
            status: booking::Status::Cancelled,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        update_booking_status::ExecutionError::Transition(
            booking::TransitionError::ReasonRequired,
        ),
    ));
}

#[tokio::test]
async fn hides_bookings_from_outsiders() {
    let service = service();
    let client = register(&service, user::Role::Client);
    let maid = register(&service, user::Role::Maid);
    let outsider = register(&service, user::Role::Client);
    let b = service.execute(booking_of(client, maid, None)).await.unwrap();

    let err = service
        .execute(command::UpdateBookingStatus {
            booking_id: b.id,
            actor_id: outsider,
            status: booking::Status::Confirmed,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        update_booking_status::ExecutionError::BookingNotExists(id)
            if *id == b.id,
    ));
}
