// TSS provisioning: create a device and drive it from CREATED to INITIALIZED.
//
// Steps run strictly in order against the remote service. A failure stops
// the run where it is; nothing is rolled back, so the device may be left in
// an intermediate state on the server.

use rand::Rng;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::json;
use strum::Display;

use crate::client::TseClient;
use crate::error::Error;
use crate::log::Verbosity;
use crate::payload::Payload;
use crate::route::{Operation, TSS};

/// Remote device states the workflow moves through.
pub mod state {
    pub const CREATED: &str = "CREATED";
    pub const UNINITIALIZED: &str = "UNINITIALIZED";
    pub const INITIALIZED: &str = "INITIALIZED";
}

/// Local record key holding the chosen admin PIN.
pub const ADMIN_PIN_KEY: &str = "adminpin";

const ADMIN_PIN_LEN: usize = 10;

/// Stage at which provisioning stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProvisionStep {
    Create,
    Uninitialize,
    SetAdminPin,
    AdminAuth,
    Initialize,
}

/// A fresh numeric admin PIN drawn from the operating system's CSPRNG.
pub fn generate_admin_pin() -> String {
    let mut rng = OsRng;
    (0..ADMIN_PIN_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

type StepResult<T> = Result<T, (ProvisionStep, Error)>;

fn at<T>(step: ProvisionStep, result: Result<T, Error>) -> StepResult<T> {
    result.map_err(|e| (step, e))
}

impl TseClient {
    /// Create a TSS and bring it to `INITIALIZED`.
    ///
    /// Issues, in order: `PUT tss/<uuid>`, `PATCH tss/<id>` (UNINITIALIZED),
    /// `PATCH tss/<id>/admin`, `POST tss/<id>/admin_auth`, `PATCH tss/<id>`
    /// (INITIALIZED). Without `admin_pin` a random one is generated. The
    /// returned record carries the final state and the PIN under `adminpin`.
    ///
    /// Any failure is returned as [`Error::Workflow`] with the step, the
    /// local record so far, and the original error as source.
    pub async fn create_tss<M>(&mut self, metadata: &M, admin_pin: Option<&str>) -> Result<Payload, Error>
    where
        M: Serialize + Sync + ?Sized,
    {
        let mut record = None;
        match self.run_provisioning(metadata, admin_pin, &mut record).await {
            Ok(()) => {
                let tss = record.unwrap_or_default();
                self.log(
                    Verbosity::Info,
                    "Create TSS success",
                    &json!({ "tss": tss, ADMIN_PIN_KEY: tss.get(ADMIN_PIN_KEY) }),
                );
                Ok(tss)
            }
            Err((step, source)) => {
                self.log(
                    Verbosity::Error,
                    "Create TSS error",
                    &json!({
                        "step": step.to_string(),
                        "tss": record,
                        ADMIN_PIN_KEY: record.as_ref().and_then(|r| r.get(ADMIN_PIN_KEY)),
                        "error": source.to_string(),
                    }),
                );
                Err(Error::Workflow {
                    step,
                    record: record.map(Box::new),
                    source: Box::new(source),
                })
            }
        }
    }

    async fn run_provisioning<M>(
        &mut self,
        metadata: &M,
        admin_pin: Option<&str>,
        record: &mut Option<Payload>,
    ) -> StepResult<()>
    where
        M: Serialize + Sync + ?Sized,
    {
        // 1. Create under a client-chosen id.
        let create = Operation::put().segment(TSS).with_uuid(true);
        let created: Payload = at(ProvisionStep::Create, self.send(&create, metadata).await)?;
        let tss = record.insert(created);

        let current = tss.get_str("state").unwrap_or_default();
        if current != state::CREATED {
            return Err((
                ProvisionStep::Create,
                Error::UnexpectedState {
                    expected: state::CREATED,
                    actual: current.to_owned(),
                },
            ));
        }
        let id = at(ProvisionStep::Create, required_field(tss, "_id"))?;
        let device = Operation::patch().segment(TSS).segment(&id);

        // 2. CREATED -> UNINITIALIZED
        let body = json!({ "state": state::UNINITIALIZED });
        at(
            ProvisionStep::Uninitialize,
            self.send::<Payload, _>(&device, &body).await,
        )?;
        tss.set("state", state::UNINITIALIZED);

        // 3. Admin PIN
        let pin = admin_pin.map_or_else(generate_admin_pin, str::to_owned);
        let puk = at(ProvisionStep::SetAdminPin, required_field(tss, "admin_puk"))?;
        at(
            ProvisionStep::SetAdminPin,
            self.change_admin_pin(&id, &puk, &pin).await,
        )?;
        tss.set(ADMIN_PIN_KEY, pin.as_str());

        // 4. Admin login
        at(ProvisionStep::AdminAuth, self.admin_auth(&id, &pin).await)?;

        // 5. UNINITIALIZED -> INITIALIZED
        let body = json!({ "state": state::INITIALIZED });
        at(
            ProvisionStep::Initialize,
            self.send::<Payload, _>(&device, &body).await,
        )?;
        tss.set("state", state::INITIALIZED);

        Ok(())
    }
}

fn required_field(tss: &Payload, key: &str) -> Result<String, Error> {
    tss.get_str(key)
        .map(str::to_owned)
        .ok_or_else(|| Error::Deserialization {
            message: format!("TSS record has no `{key}`"),
            body: tss.raw_body().unwrap_or_default().to_owned(),
        })
}
