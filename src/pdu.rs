//! PDU 정의와 인코딩/디코딩
//!
//! 와이어 포맷: `[type:1][seq:1][payload:0..=1478]`
//!
//! seq 필드는 와이어 상에서 1바이트이지만 의미상 0/1만 유효하다
//! (stop-and-wait 교대 비트). 0/1이 아닌 값은 어떤 비트와도 일치하지 않는다.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::{HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    /// 인증 요청 (credential 페이로드)
    Hello,

    /// 쓰기 요청 (filename + NUL 페이로드)
    Wrq,

    /// 데이터 블록
    Data,

    /// 확인 응답 (빈 페이로드 = 성공, 비어있지 않으면 에러 메시지)
    Ack,

    /// 전송 종료 (filename + NUL 페이로드)
    Fin,

    /// 알 수 없는 타입 (로그 후 무시, 거부하지 않음)
    Unknown(u8),
}

impl PduType {
    pub fn from_wire(code: u8) -> Self {
        match code {
            1 => PduType::Hello,
            2 => PduType::Wrq,
            3 => PduType::Data,
            4 => PduType::Ack,
            5 => PduType::Fin,
            other => PduType::Unknown(other),
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            PduType::Hello => 1,
            PduType::Wrq => 2,
            PduType::Data => 3,
            PduType::Ack => 4,
            PduType::Fin => 5,
            PduType::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PduType::Hello => write!(f, "HELLO"),
            PduType::Wrq => write!(f, "WRQ"),
            PduType::Data => write!(f, "DATA"),
            PduType::Ack => write!(f, "ACK"),
            PduType::Fin => write!(f, "FIN"),
            PduType::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// 교대 비트 (alternating bit)
///
/// 카운터가 아닌 1비트 enum으로 모델링하여 중복/순서이탈 판별을
/// 전수적으로 만든다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqBit {
    Zero,
    One,
}

impl SeqBit {
    /// 다음 비트로 교대
    pub fn toggle(self) -> Self {
        match self {
            SeqBit::Zero => SeqBit::One,
            SeqBit::One => SeqBit::Zero,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            SeqBit::Zero => 0,
            SeqBit::One => 1,
        }
    }

    /// 와이어 seq 바이트와 비교 (0/1 이외의 값은 어떤 비트와도 불일치)
    pub fn matches(self, raw: u8) -> bool {
        raw == self.as_u8()
    }
}

impl std::fmt::Display for SeqBit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// PDU (Protocol Data Unit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// 메시지 타입
    pub ty: PduType,

    /// 와이어 seq 바이트 (의미상 0/1)
    pub seq: u8,

    /// 페이로드 (0..=1478 바이트)
    pub payload: Bytes,
}

impl Pdu {
    pub fn new(ty: PduType, seq: u8, payload: Bytes) -> Self {
        Self { ty, seq, payload }
    }

    /// HELLO는 항상 seq=0
    pub fn hello(credential: &str) -> Self {
        Self::new(PduType::Hello, 0, Bytes::copy_from_slice(credential.as_bytes()))
    }

    /// WRQ는 항상 seq=1, 페이로드는 filename + NUL
    pub fn wrq(filename: &str) -> Self {
        let mut payload = Vec::with_capacity(filename.len() + 1);
        payload.extend_from_slice(filename.as_bytes());
        payload.push(0);
        Self::new(PduType::Wrq, 1, Bytes::from(payload))
    }

    pub fn data(bit: SeqBit, block: Bytes) -> Self {
        Self::new(PduType::Data, bit.as_u8(), block)
    }

    /// ACK는 수신한 seq를 그대로 에코. 빈 메시지 = 성공
    pub fn ack(seq: u8, message: &str) -> Self {
        Self::new(PduType::Ack, seq, Bytes::copy_from_slice(message.as_bytes()))
    }

    /// FIN 페이로드는 WRQ와 동일하게 filename + NUL
    pub fn fin(bit: SeqBit, filename: &str) -> Self {
        let mut payload = Vec::with_capacity(filename.len() + 1);
        payload.extend_from_slice(filename.as_bytes());
        payload.push(0);
        Self::new(PduType::Fin, bit.as_u8(), Bytes::from(payload))
    }

    /// 바이트로 인코딩
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::OversizedPayload {
                len: self.payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.push(self.ty.to_wire());
        buf.push(self.seq);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// 바이트에서 디코딩
    ///
    /// 2바이트 미만이면 `Truncated`. 알 수 없는 타입은 `Unknown`으로
    /// 보존하여 수신측이 로그 후 무시할 수 있게 한다.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Truncated { len: bytes.len() });
        }

        Ok(Self {
            ty: PduType::from_wire(bytes[0]),
            seq: bytes[1],
            payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..]),
        })
    }
}
