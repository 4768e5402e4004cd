use crate::com::{ComResult, Guid, HResult, IUnknownVtbl, Interface, RawPtr};

use super::types::AUDIOCLOCK_CHARACTERISTIC_FIXED_FREQ;

pub const IID_IAUDIO_CLOCK: Guid = Guid::from_u128(0xcd63314f_3fba_4a1b_812c_ef96358728e7);

#[repr(C)]
pub struct IAudioClockVtbl {
    pub base: IUnknownVtbl,
    pub get_frequency: unsafe extern "system" fn(this: RawPtr, frequency: *mut u64) -> HResult,
    pub get_position: unsafe extern "system" fn(this: RawPtr, position: *mut u64, qpc_position: *mut u64) -> HResult,
    pub get_characteristics: unsafe extern "system" fn(this: RawPtr, characteristics: *mut u32) -> HResult,
}

com_interface! {
    /// Stream position in device clock units.
    pub struct IAudioClock: IAudioClockVtbl = IID_IAUDIO_CLOCK;
}

impl IAudioClock {
    /// Clock ticks per second.
    pub unsafe fn get_frequency(&self) -> ComResult<u64> {
        let mut frequency = 0u64;
        (self.vtable().get_frequency)(self.as_raw(), &mut frequency).check(method!(IAudioClock::GetFrequency))?;
        Ok(frequency)
    }

    /// Returns `(position, qpc_position)`. `AUDCLNT_S_POSITION_STALLED`
    /// counts as success.
    pub unsafe fn get_position(&self) -> ComResult<(u64, u64)> {
        let mut position = 0u64;
        let mut qpc_position = 0u64;
        (self.vtable().get_position)(self.as_raw(), &mut position, &mut qpc_position)
            .check(method!(IAudioClock::GetPosition))?;
        Ok((position, qpc_position))
    }

    /// `AUDIOCLOCK_CHARACTERISTIC_*` flags.
    pub unsafe fn get_characteristics(&self) -> ComResult<u32> {
        let mut characteristics = 0u32;
        (self.vtable().get_characteristics)(self.as_raw(), &mut characteristics)
            .check(method!(IAudioClock::GetCharacteristics))?;
        Ok(characteristics)
    }

    /// Position in seconds, derived from the current position and frequency.
    pub unsafe fn position_seconds(&self) -> ComResult<f64> {
        let frequency = self.get_frequency()?;
        let (position, _) = self.get_position()?;
        if frequency == 0 {
            return Ok(0.0);
        }
        Ok(position as f64 / frequency as f64)
    }

    /// Whether the frequency reported by `get_frequency` never changes.
    pub unsafe fn has_fixed_frequency(&self) -> ComResult<bool> {
        Ok(self.get_characteristics()? & AUDIOCLOCK_CHARACTERISTIC_FIXED_FREQ != 0)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_relative_eq;

    use super::*;
    use crate::com::hresult::{AUDCLNT_E_DEVICE_INVALIDATED, AUDCLNT_S_POSITION_STALLED, S_OK};
    use crate::testing::{fake_unknown, state, Fake};

    struct ClockState {
        frequency: u64,
        position: Cell<u64>,
        status: Cell<HResult>,
    }

    unsafe extern "system" fn get_frequency(this: RawPtr, frequency: *mut u64) -> HResult {
        *frequency = state::<IAudioClockVtbl, ClockState>(this).frequency;
        S_OK
    }

    unsafe extern "system" fn get_position(this: RawPtr, position: *mut u64, qpc_position: *mut u64) -> HResult {
        let clock = state::<IAudioClockVtbl, ClockState>(this);
        *position = clock.position.get();
        *qpc_position = 123_456;
        clock.status.get()
    }

    unsafe extern "system" fn get_characteristics(_this: RawPtr, characteristics: *mut u32) -> HResult {
        *characteristics = AUDIOCLOCK_CHARACTERISTIC_FIXED_FREQ;
        S_OK
    }

    static CLOCK_VTBL: IAudioClockVtbl = IAudioClockVtbl {
        base: fake_unknown!(IAudioClockVtbl, ClockState),
        get_frequency,
        get_position,
        get_characteristics,
    };

    fn fake_clock(frequency: u64, position: u64) -> Fake<IAudioClockVtbl, ClockState> {
        let state = ClockState {
            frequency,
            position: Cell::new(position),
            status: Cell::new(S_OK),
        };
        Fake::new(&CLOCK_VTBL, &[IID_IAUDIO_CLOCK], state)
    }

    #[test]
    fn reads_frequency_and_position() {
        let fake = fake_clock(192_000, 96_000);
        let clock: IAudioClock = fake.handle();
        unsafe {
            assert_eq!(clock.get_frequency().unwrap(), 192_000);
            assert_eq!(clock.get_position().unwrap(), (96_000, 123_456));
            assert_relative_eq!(clock.position_seconds().unwrap(), 0.5);
            assert!(clock.has_fixed_frequency().unwrap());
        }
    }

    #[test]
    fn stalled_position_is_success() {
        let fake = fake_clock(48_000, 10);
        fake.state().status.set(AUDCLNT_S_POSITION_STALLED);
        let clock: IAudioClock = fake.handle();
        assert_eq!(unsafe { clock.get_position() }.unwrap().0, 10);

        fake.state().status.set(AUDCLNT_E_DEVICE_INVALIDATED);
        let err = unsafe { clock.get_position() }.unwrap_err();
        assert_eq!(
            err.to_string(),
            "IAudioClock::GetPosition failed with code: 0x88890004 (AUDCLNT_E_DEVICE_INVALIDATED)"
        );
    }
}
