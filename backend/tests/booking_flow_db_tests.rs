//! End-to-end service flows against PostgreSQL
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch database and
//! `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;
    use uuid::Uuid;

    use ecoride_server::account::{
        AccountService, Actor, CreateEmployeeRequest, Role, UpdateCapabilitiesRequest,
    };
    use ecoride_server::auth::{AuthService, RegisterRequest};
    use ecoride_server::booking::{Booking, BookingService, BookingStatus};
    use ecoride_server::error::ApiError;
    use ecoride_server::incident::{IncidentService, IncidentStatus};
    use ecoride_server::ride::{CreateRideRequest, Ride, RideService, RideStatus};
    use ecoride_server::vehicle::{CreateVehicleRequest, EnergyType, VehicleService};

    const FEE: i64 = 2;
    const SIGNUP_CREDITS: i64 = 30;

    struct Services {
        auth: AuthService,
        accounts: AccountService,
        vehicles: VehicleService,
        rides: RideService,
        bookings: BookingService,
        incidents: IncidentService,
    }

    /// Booked and driven to the point where the passenger gives feedback
    async fn finished_trip(services: &Services) -> (Actor, Actor, Ride, Booking) {
        let driver = register(services).await;
        let passenger = register(services).await;
        let ride = publish_ride(services, driver, 2).await;

        let booking = services
            .bookings
            .create_booking(passenger, ride.id, 1)
            .await
            .unwrap();
        services.rides.start_ride(driver, ride.id).await.unwrap();
        services.rides.end_ride(driver, ride.id).await.unwrap();

        (driver, passenger, ride, booking)
    }

    async fn setup() -> Services {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/ecoride_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        services(pool)
    }

    fn services(pool: PgPool) -> Services {
        Services {
            auth: AuthService::new(pool.clone(), "db-test-secret".to_string(), 900, 7, SIGNUP_CREDITS),
            accounts: AccountService::new(pool.clone()),
            vehicles: VehicleService::new(pool.clone()),
            rides: RideService::new(pool.clone()),
            bookings: BookingService::new(pool.clone(), FEE),
            incidents: IncidentService::new(pool),
        }
    }

    async fn register(services: &Services) -> Actor {
        let tag = Uuid::new_v4().simple().to_string();
        let tokens = services
            .auth
            .register(RegisterRequest {
                email: format!("{}@example.com", tag),
                pseudo: format!("u{}", &tag[..20]),
                password: "correct horse battery".to_string(),
            })
            .await
            .expect("registration");
        assert_eq!(tokens.account.credits, SIGNUP_CREDITS);
        Actor::new(tokens.account.id, Role::User)
    }

    async fn credits(services: &Services, actor: Actor) -> i64 {
        services.accounts.get_account(actor.account_id).await.unwrap().credits
    }

    async fn publish_ride(services: &Services, driver: Actor, seats: i32) -> Ride {
        publish_priced_ride(services, driver, seats, 20).await
    }

    async fn publish_priced_ride(services: &Services, driver: Actor, seats: i32, price: i32) -> Ride {
        services
            .accounts
            .update_capabilities(
                driver,
                UpdateCapabilitiesRequest {
                    is_driver: true,
                    is_passenger: false,
                },
            )
            .await
            .unwrap();

        let plate = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        let vehicle = services
            .vehicles
            .create_vehicle(
                driver,
                CreateVehicleRequest {
                    brand: "Tesla".to_string(),
                    model: "Model 3".to_string(),
                    color: "white".to_string(),
                    plate_number: plate,
                    first_registration: None,
                    energy: EnergyType::Electric,
                    seats: 4,
                },
            )
            .await
            .unwrap();

        let departure = Utc::now() + Duration::days(1);
        services
            .rides
            .create_ride(
                driver,
                CreateRideRequest {
                    vehicle_id: vehicle.id,
                    departure_city: "Bordeaux".to_string(),
                    departure_address: "Saint-Jean".to_string(),
                    departure_at: departure,
                    arrival_city: "Toulouse".to_string(),
                    arrival_address: "Matabiau".to_string(),
                    arrival_at: departure + Duration::hours(3),
                    price,
                    offered_seats: seats,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_book_cancel_round_trip() {
        let services = setup().await;
        let driver = register(&services).await;
        let passenger = register(&services).await;
        let ride = publish_ride(&services, driver, 2).await;
        assert!(ride.is_eco_friendly);

        let booking = services
            .bookings
            .create_booking(passenger, ride.id, 1)
            .await
            .unwrap();
        assert_eq!(credits(&services, passenger).await, 10);
        let after_booking = services.rides.get_ride(ride.id).await.unwrap();
        assert_eq!(after_booking.available_seats, 1);
        assert_eq!(after_booking.status, RideStatus::Open);

        let second = services.bookings.create_booking(passenger, ride.id, 1).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        let cancelled = services
            .bookings
            .cancel_booking(passenger, booking.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(credits(&services, passenger).await, SIGNUP_CREDITS);
        assert_eq!(
            services.rides.get_ride(ride.id).await.unwrap().available_seats,
            2
        );
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_driver_cannot_book_own_ride() {
        let services = setup().await;
        let driver = register(&services).await;
        let ride = publish_ride(&services, driver, 2).await;

        let result = services.bookings.create_booking(driver, ride.id, 1).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_successful_trip_pays_driver() {
        let services = setup().await;
        let driver = register(&services).await;
        let passenger = register(&services).await;
        let ride = publish_ride(&services, driver, 2).await;

        let booking = services
            .bookings
            .create_booking(passenger, ride.id, 1)
            .await
            .unwrap();
        services.rides.start_ride(driver, ride.id).await.unwrap();
        services.rides.end_ride(driver, ride.id).await.unwrap();

        let awaiting = services
            .bookings
            .get_booking(passenger, booking.id)
            .await
            .unwrap();
        assert_eq!(awaiting.status, BookingStatus::AwaitingFeedback);

        services
            .bookings
            .confirm_successful_booking(passenger, booking.id)
            .await
            .unwrap();
        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS + 18);

        let again = services
            .bookings
            .confirm_successful_booking(passenger, booking.id)
            .await;
        assert!(matches!(again, Err(ApiError::InvalidState(_))));
        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS + 18);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_incident_defers_payout_to_resolution() {
        let services = setup().await;
        let driver = register(&services).await;
        let passenger = register(&services).await;
        let ride = publish_ride(&services, driver, 2).await;

        let booking = services
            .bookings
            .create_booking(passenger, ride.id, 1)
            .await
            .unwrap();
        services.rides.start_ride(driver, ride.id).await.unwrap();
        services.rides.end_ride(driver, ride.id).await.unwrap();

        let incident = services
            .bookings
            .confirm_booking_with_incident(passenger, booking.id, "Driver smoked in the car")
            .await
            .unwrap();
        assert_eq!(incident.status, IncidentStatus::Pending);
        assert_eq!(incident.reward_amount, 18);
        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS);

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let mut employees = Vec::new();
        for _ in 0..2 {
            let tag = Uuid::new_v4().simple().to_string();
            let employee = services
                .accounts
                .create_employee(
                    admin,
                    CreateEmployeeRequest {
                        email: format!("{}@ecoride.test", tag),
                        pseudo: format!("e{}", &tag[..20]),
                        password: "employee-password".to_string(),
                    },
                )
                .await
                .unwrap();
            employees.push(Actor::new(employee.id, Role::Employee));
        }

        services
            .incidents
            .assign_incident(employees[0], incident.id)
            .await
            .unwrap();
        let other = services.incidents.assign_incident(employees[1], incident.id).await;
        assert!(matches!(other, Err(ApiError::Conflict(_))));
        let same = services.incidents.assign_incident(employees[0], incident.id).await;
        assert!(matches!(same, Err(ApiError::Conflict(_))));

        let wrong = services
            .incidents
            .resolve_incident(employees[1], incident.id, "not mine")
            .await;
        assert!(matches!(wrong, Err(ApiError::Forbidden(_))));

        let resolved = services
            .incidents
            .resolve_incident(employees[0], incident.id, "Warning sent to driver")
            .await
            .unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS + 18);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cancelling_ride_refunds_passengers() {
        let services = setup().await;
        let driver = register(&services).await;
        let passenger = register(&services).await;
        let ride = publish_ride(&services, driver, 1).await;

        let booking = services
            .bookings
            .create_booking(passenger, ride.id, 1)
            .await
            .unwrap();
        assert_eq!(
            services.rides.get_ride(ride.id).await.unwrap().status,
            RideStatus::Full
        );

        let cancelled = services.rides.cancel_ride(driver, ride.id).await.unwrap();
        assert_eq!(cancelled.status, RideStatus::Cancelled);
        assert_eq!(credits(&services, passenger).await, SIGNUP_CREDITS);

        let booking = services
            .bookings
            .get_booking(passenger, booking.id)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        let restart = services.rides.start_ride(driver, ride.id).await;
        assert!(matches!(restart, Err(ApiError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_booking_without_funds_leaves_ride_untouched() {
        let services = setup().await;
        let driver = register(&services).await;
        let passenger = register(&services).await;
        let ride = publish_priced_ride(&services, driver, 2, 40).await;

        let result = services.bookings.create_booking(passenger, ride.id, 1).await;
        assert!(matches!(result, Err(ApiError::InsufficientFunds(_))));

        assert_eq!(credits(&services, passenger).await, SIGNUP_CREDITS);
        let ride = services.rides.get_ride(ride.id).await.unwrap();
        assert_eq!(ride.available_seats, 2);
        assert_eq!(ride.status, RideStatus::Open);
        assert!(services
            .bookings
            .list_passenger_bookings(passenger)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_ride_transitions_require_owning_driver() {
        let services = setup().await;
        let driver = register(&services).await;
        let stranger = register(&services).await;
        let ride = publish_ride(&services, driver, 2).await;

        let start = services.rides.start_ride(stranger, ride.id).await;
        assert!(matches!(start, Err(ApiError::NotFound(_))));
        let cancel = services.rides.cancel_ride(stranger, ride.id).await;
        assert!(matches!(cancel, Err(ApiError::NotFound(_))));

        services.rides.start_ride(driver, ride.id).await.unwrap();
        let end = services.rides.end_ride(stranger, ride.id).await;
        assert!(matches!(end, Err(ApiError::NotFound(_))));

        assert_eq!(
            services.rides.get_ride(ride.id).await.unwrap().status,
            RideStatus::InProgress
        );
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_incident_excludes_success_payout() {
        let services = setup().await;
        let (driver, passenger, _ride, booking) = finished_trip(&services).await;

        services
            .bookings
            .confirm_booking_with_incident(passenger, booking.id, "Driver was two hours late")
            .await
            .unwrap();

        let success = services
            .bookings
            .confirm_successful_booking(passenger, booking.id)
            .await;
        assert!(matches!(success, Err(ApiError::InvalidState(_))));

        let second = services
            .bookings
            .confirm_booking_with_incident(passenger, booking.id, "Reporting the delay again")
            .await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_success_payout_excludes_incident() {
        let services = setup().await;
        let (driver, passenger, _ride, booking) = finished_trip(&services).await;

        services
            .bookings
            .confirm_successful_booking(passenger, booking.id)
            .await
            .unwrap();

        let incident = services
            .bookings
            .confirm_booking_with_incident(passenger, booking.id, "Changed my mind afterwards")
            .await;
        assert!(matches!(incident, Err(ApiError::InvalidState(_))));
        assert_eq!(credits(&services, driver).await, SIGNUP_CREDITS + 18);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cannot_cancel_booking_awaiting_feedback() {
        let services = setup().await;
        let (_driver, passenger, ride, booking) = finished_trip(&services).await;

        let result = services.bookings.cancel_booking(passenger, booking.id).await;
        assert!(matches!(result, Err(ApiError::InvalidState(_))));

        let booking = services
            .bookings
            .get_booking(passenger, booking.id)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::AwaitingFeedback);
        assert_eq!(credits(&services, passenger).await, SIGNUP_CREDITS - ride.price as i64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore] // Requires database setup
    async fn test_concurrent_ride_cancellations_sharing_passengers() {
        let services = setup().await;

        for _ in 0..20 {
            let driver = register(&services).await;
            let first = register(&services).await;
            let second = register(&services).await;
            let ride_a = publish_priced_ride(&services, driver, 2, 10).await;
            let ride_b = publish_priced_ride(&services, driver, 2, 10).await;

            for (ride, passenger) in [
                (ride_a.id, first),
                (ride_a.id, second),
                (ride_b.id, second),
                (ride_b.id, first),
            ] {
                services
                    .bookings
                    .create_booking(passenger, ride, 1)
                    .await
                    .unwrap();
            }

            let rides_a = services.rides.clone();
            let rides_b = services.rides.clone();
            let cancel_a = tokio::spawn(async move { rides_a.cancel_ride(driver, ride_a.id).await });
            let cancel_b = tokio::spawn(async move { rides_b.cancel_ride(driver, ride_b.id).await });

            let (result_a, result_b) = tokio::join!(cancel_a, cancel_b);
            assert_eq!(result_a.unwrap().unwrap().status, RideStatus::Cancelled);
            assert_eq!(result_b.unwrap().unwrap().status, RideStatus::Cancelled);

            assert_eq!(credits(&services, first).await, SIGNUP_CREDITS);
            assert_eq!(credits(&services, second).await, SIGNUP_CREDITS);
        }
    }
}
